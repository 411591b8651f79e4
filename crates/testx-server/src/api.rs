//! The named operations a testx server exposes to test harnesses

use std::fmt::{Display, Formatter};

use enumset::{EnumSet, EnumSetType};

/// An operation of the testx API, by its wire name
#[derive(EnumSetType, Debug)]
pub enum ApiMethod {
    Bootstrap,
    Start,
    Close,
    SetData,
    GetData,
    ResetData,
    GetGraphQlSchema,
    GetDatabaseSchema,
}

impl ApiMethod {
    /// The name harnesses use to refer to the operation
    pub const fn name(self) -> &'static str {
        match self {
            ApiMethod::Bootstrap => "bootstrap",
            ApiMethod::Start => "start",
            ApiMethod::Close => "close",
            ApiMethod::SetData => "setData",
            ApiMethod::GetData => "getData",
            ApiMethod::ResetData => "resetData",
            ApiMethod::GetGraphQlSchema => "getGraphQlSchema",
            ApiMethod::GetDatabaseSchema => "getDatabaseSchema",
        }
    }

    /// Look up an operation by its exact, case-sensitive name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bootstrap" => Some(ApiMethod::Bootstrap),
            "start" => Some(ApiMethod::Start),
            "close" => Some(ApiMethod::Close),
            "setData" => Some(ApiMethod::SetData),
            "getData" => Some(ApiMethod::GetData),
            "resetData" => Some(ApiMethod::ResetData),
            "getGraphQlSchema" => Some(ApiMethod::GetGraphQlSchema),
            "getDatabaseSchema" => Some(ApiMethod::GetDatabaseSchema),
            _ => None,
        }
    }
}

impl Display for ApiMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Anything exposing a fixed set of testx API operations
pub trait ApiSurface {
    fn api_methods(&self) -> EnumSet<ApiMethod>;
}

/// Whether `name` is an operation of the API exposed by `instance`
///
/// Names are matched exactly, so `"Start"` is not the `start` operation. Unknown names,
/// including the empty string, are never API methods.
pub fn is_testx_api_method<T: ApiSurface + ?Sized>(instance: &T, name: &str) -> bool {
    ApiMethod::from_name(name).is_some_and(|method| instance.api_methods().contains(method))
}
