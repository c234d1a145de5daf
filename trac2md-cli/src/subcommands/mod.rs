pub(crate) mod anchors;
pub(crate) mod convert;
