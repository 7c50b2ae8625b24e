//! Protocol Adapters (C9, §4.9).

pub mod graphql;
pub mod grpc;
pub mod hygiene;
pub mod rest;
pub mod soap;

use crate::models::ApiType;

/// The gateway's four public protocol ingress shapes, distinct from
/// `ApiType` only in that gRPC-Web is its own ingress onto the gRPC type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingress {
    Rest,
    Soap,
    Graphql,
    Grpc,
    GrpcWeb,
}

impl Ingress {
    pub fn matches_api_type(self, api_type: ApiType) -> bool {
        match self {
            Ingress::Rest => api_type == ApiType::Rest,
            Ingress::Soap => api_type == ApiType::Soap,
            Ingress::Graphql => api_type == ApiType::Graphql,
            Ingress::Grpc | Ingress::GrpcWeb => api_type == ApiType::Grpc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingress_type_mismatch_is_detected() {
        assert!(!Ingress::Rest.matches_api_type(ApiType::Grpc));
        assert!(Ingress::GrpcWeb.matches_api_type(ApiType::Grpc));
    }
}
