mod common;
mod plan_tests;
mod resolver_tests;
