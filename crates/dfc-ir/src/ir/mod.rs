//! Circuit IR: types, expressions, ZSet literals, aggregates, operators and circuits

pub mod aggregate;
pub mod circuit;
pub mod expr;
pub mod operator;
pub mod types;
pub mod zset;
