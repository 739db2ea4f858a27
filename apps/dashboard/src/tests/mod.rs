mod app;
mod cli;
mod logger;
mod session;
