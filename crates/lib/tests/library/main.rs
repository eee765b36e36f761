mod common;
mod lifecycle_tests;
mod project_tests;
