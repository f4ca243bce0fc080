// Discord adapters for the username spam filter.

pub mod commands;
pub mod events;
pub mod serenity_directory;
