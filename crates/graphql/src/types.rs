//! GraphQL type definitions.

use async_graphql::{EmptyMutation, EmptySubscription, Schema};

use crate::schema::RetailQuery;

/// The retailer GraphQL schema type.
pub type RetailSchema = Schema<RetailQuery, EmptyMutation, EmptySubscription>;
