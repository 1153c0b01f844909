pub mod command_router;
