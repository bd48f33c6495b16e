//! Pure string rules shared by the reports and repairs.
pub mod dropdown;
pub mod placeholder;
pub mod suggest;
