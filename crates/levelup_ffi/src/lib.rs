//! Flutter bridge surface for LevelUp core.

pub mod api;
