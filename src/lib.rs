// Library for tests to access modules

pub mod aggregation;
pub mod classifier;
pub mod config;
pub mod email_worker;
pub mod mailer;
pub mod models;
pub mod probe;
pub mod routes;
pub mod sample_repo;
pub mod version;
