pub mod bookmark;
pub mod fork;
pub mod navigate;
pub mod phantoms;
pub mod view;
