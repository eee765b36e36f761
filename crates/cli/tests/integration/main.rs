mod common;
mod lifecycle_tests;
