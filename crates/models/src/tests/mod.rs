/// Constructor and mutable-field allow-list tests
pub mod validation_tests;
