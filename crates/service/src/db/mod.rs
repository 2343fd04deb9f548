pub mod fuel_session_service;
