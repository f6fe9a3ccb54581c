mod orchestration;
pub(crate) mod support;
