#![allow(clippy::mem_replace_with_default, clippy::comparison_chain)]

pub mod rect;
