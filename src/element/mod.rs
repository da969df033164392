pub(crate) mod completion;
pub(crate) mod controller;
pub(crate) mod tokens;
