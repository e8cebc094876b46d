mod chat;
mod embed;
mod errors;
