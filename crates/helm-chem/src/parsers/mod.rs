pub(crate) mod formula;
pub(crate) mod primitives;
