pub mod dto;
pub mod ports;
pub mod report;
pub mod services;
