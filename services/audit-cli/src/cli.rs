use clap::{ArgAction, Parser, Subcommand};

/// Command-line client for the security audit assistant
#[derive(Parser)]
#[command(name = "audit-cli", version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in and store the session tokens
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUDIT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and store the session tokens
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUDIT_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
    },
    /// Forget the stored tokens
    Logout,
    /// Show the logged-in user's profile
    Whoami,
    /// List your conversations
    Chats,
    /// Start a new conversation
    CreateChat { name: String },
    /// Send a prompt to a conversation and print the reply
    Send { chat_id: String, prompt: String },
    /// Show the messages of a conversation
    Messages { chat_id: String },
    /// List all users (admin)
    Users,
    /// Activate or deactivate a user (admin)
    UserStatus {
        user_id: String,
        #[arg(action = ArgAction::Set)]
        active: bool,
    },
    /// Delete a conversation
    DeleteChat { chat_id: String },
}

impl Command {
    /// Name used in logs; never includes arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Register { .. } => "register",
            Command::Logout => "logout",
            Command::Whoami => "whoami",
            Command::Chats => "chats",
            Command::CreateChat { .. } => "create-chat",
            Command::Send { .. } => "send",
            Command::Messages { .. } => "messages",
            Command::Users => "users",
            Command::UserStatus { .. } => "user-status",
            Command::DeleteChat { .. } => "delete-chat",
        }
    }
}
