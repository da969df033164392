pub(crate) mod ease;
pub(crate) mod preset;
pub(crate) mod props;
