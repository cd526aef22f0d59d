//! Common library exports shared between the store and the search backends.

extern crate serde;


pub mod search_query;
pub mod search_result;
pub mod search_const;
