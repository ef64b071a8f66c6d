//! Page renderers for the main content area.

pub mod article;
pub mod editor;
pub mod home;
