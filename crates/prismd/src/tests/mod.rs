//! Test suites for the Prism gateway bootstrap and process loop.

pub(crate) mod support;
