use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::AccessType;

#[derive(Parser, Debug)]
#[clap(version, about = "Dropbox over OAuth1 from the command line")]
pub struct Cli {
    #[clap(long, env = "DROPBOX_APP_KEY")]
    pub app_key: String,

    #[clap(long, env = "DROPBOX_APP_SECRET", hide_env_values = true)]
    pub app_secret: String,

    /// `dropbox` for the whole account or `app_folder` for the sandbox
    #[clap(long, default_value = "app_folder", env = "DROPBOX_ACCESS_TYPE")]
    pub access_type: AccessType,

    #[clap(long, default_value = "./data/auth.json", env = "DROPBOX_TOKEN_FILE")]
    pub token_file: PathBuf,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the authorization flow and store the access token
    Authorize {
        /// Where the consent page sends the user afterwards
        #[clap(long)]
        callback: Option<String>,
        #[clap(long, default_value = "en-US")]
        locale: String,
    },
    /// Show account information
    Account,
    /// List a folder or show the metadata of a file
    List {
        #[clap(default_value = "/")]
        path: String,
        #[clap(long)]
        file_limit: Option<u32>,
        #[clap(long)]
        include_deleted: bool,
    },
    /// Download a file; to stdout unless --dest is given
    Download {
        path: String,
        #[clap(short, long)]
        dest: Option<PathBuf>,
        #[clap(long)]
        rev: Option<String>,
    },
    /// Upload a local file into a remote folder
    Upload {
        file: PathBuf,
        #[clap(short, long, default_value = "/")]
        dest: String,
        #[clap(short, long)]
        name: Option<String>,
        #[clap(long)]
        no_overwrite: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["dropbox-oauth1", "--app-key", "k", "--app-secret", "s"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = parse(&["account"]);
        assert_eq!(cli.access_type, AccessType::AppFolder);
        assert_eq!(cli.token_file, PathBuf::from("./data/auth.json"));
        assert!(matches!(cli.command, Command::Account));
    }

    #[test]
    fn upload_flags() {
        let cli = parse(&[
            "--access-type",
            "dropbox",
            "upload",
            "test.png",
            "--dest",
            "/Photos",
            "--no-overwrite",
        ]);
        assert_eq!(cli.access_type, AccessType::Dropbox);
        match cli.command {
            Command::Upload {
                file,
                dest,
                name,
                no_overwrite,
            } => {
                assert_eq!(file, PathBuf::from("test.png"));
                assert_eq!(dest, "/Photos");
                assert_eq!(name, None);
                assert!(no_overwrite);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_access_type() {
        let result = Cli::try_parse_from([
            "dropbox-oauth1",
            "--app-key",
            "k",
            "--app-secret",
            "s",
            "--access-type",
            "sandbox",
            "account",
        ]);
        assert!(result.is_err());
    }
}
