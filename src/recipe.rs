pub(crate) mod model;
pub(crate) mod path;
pub(crate) mod random;
pub(crate) mod resolver;
