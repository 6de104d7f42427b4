pub mod broadcast;
pub mod connctx;
pub mod lifecycle;
pub mod registry;
pub mod userctx;
