use crate::domain::model::{InputFormat, LocationRecord, Operation, Provider};
use crate::domain::report::TransformResult;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn input_format(&self) -> InputFormat;
    fn output_path(&self) -> &str;
    fn operation(&self) -> Operation;
    fn provider(&self) -> Provider;
    fn endpoint(&self) -> &str;
    fn user_agent(&self) -> &str;
    fn api_key(&self) -> Option<&str>;
    fn timeout(&self) -> Duration;
    fn max_retries(&self) -> u32;
    fn retry_delay(&self) -> Duration;
    fn request_delay(&self) -> Duration;
    fn regeocode(&self) -> bool;
}

/// One candidate returned by a lookup service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupMatch {
    pub lat: f64,
    pub lng: f64,
}

/// What a single lookup request came back with, once transport succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupReply {
    /// Best matches first; may be empty.
    Matches(Vec<LookupMatch>),
    RateLimited,
    /// Any other unsuccessful HTTP status.
    Status(u16),
    /// The service answered but a match could not be read.
    Malformed(String),
    /// The service refused the request; retrying will not help.
    Rejected(String),
}

/// A remote address lookup service. `Err` means the request itself failed
/// (timeout, connection refused, unreadable body).
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn lookup(&self, address: &str) -> Result<LookupReply>;
}

#[async_trait]
impl<T: AddressLookup + ?Sized> AddressLookup for Box<T> {
    async fn lookup(&self, address: &str) -> Result<LookupReply> {
        (**self).lookup(address).await
    }
}

#[async_trait]
impl<'a, T: AddressLookup + ?Sized> AddressLookup for &'a T {
    async fn lookup(&self, address: &str) -> Result<LookupReply> {
        (**self).lookup(address).await
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn operation(&self) -> Operation;
    async fn extract(&self) -> Result<Vec<LocationRecord>>;
    async fn transform(&self, data: Vec<LocationRecord>) -> Result<TransformResult>;
    async fn load(&self, result: &TransformResult) -> Result<Option<String>>;
}
