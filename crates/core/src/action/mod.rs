pub mod action_executor;
