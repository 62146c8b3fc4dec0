mod api;
mod client;

pub use api::ServiceAccountCredentialsApi;
pub use client::IamCredentialsClient;
