pub(crate) mod apply;
pub(crate) mod render;
pub(crate) mod validate;
