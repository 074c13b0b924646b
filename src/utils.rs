pub mod bitflags;
pub mod clonecell;
pub mod copyhashmap;
pub mod errorfmt;
pub mod numcell;
pub mod ptr_ext;
