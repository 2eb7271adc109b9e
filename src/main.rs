use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};
use clap::Parser;
use dropbox_oauth1::cli::{Cli, Command};
use dropbox_oauth1::{
    Client, Credentials, Error, FileTokenStore, MetadataOptions, Session, TokenStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dropbox_oauth1=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let store = FileTokenStore::new(&cli.token_file);
    let session = Session::new(
        Credentials::new(cli.app_key, cli.app_secret),
        cli.access_type,
    )?;

    if let Command::Authorize { callback, locale } = &cli.command {
        if store.load()?.is_some() {
            println!(
                "Already authorized; remove {} to start over.",
                store.path().display()
            );
            return Ok(());
        }
        let request_token = session
            .obtain_request_token()
            .context("unable to get request token")?;
        let url = session.build_authorize_url(
            &request_token,
            callback.as_deref(),
            Some(locale.as_str()),
        )?;
        println!("Please visit {} and authorize this application.", url);
        print!("Press Enter once done: ");
        io::stdout().flush()?;
        io::stdin().lock().read_line(&mut String::new())?;

        let session = session.obtain_access_token(request_token)?;
        store.save(session.access_token())?;
        println!("Authorized as uid {}.", session.access_token().uid);
        return Ok(());
    }

    let token = match store.load()? {
        Some(token) => token,
        None => bail!(
            "no access token in {}, run `authorize` first",
            store.path().display()
        ),
    };
    let client = Client::new(session.authorize(token));
    match run(&client, cli.command) {
        Err(e) if is_unauthorized(&e) => {
            store.clear()?;
            bail!("{}; the stored token was removed, run `authorize` again", e)
        }
        other => other,
    }
}

fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Error>()
        .map_or(false, Error::is_unauthorized)
}

fn run(client: &Client, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Authorize { .. } => {}
        Command::Account => print_json(&client.account_info()?),
        Command::List {
            path,
            file_limit,
            include_deleted,
        } => {
            let options = MetadataOptions {
                file_limit: file_limit.or(MetadataOptions::default().file_limit),
                include_deleted,
                ..MetadataOptions::default()
            };
            print_json(&client.metadata(&path, &options)?);
        }
        Command::Download { path, dest, rev } => {
            let file = client.get_file(&path, dest.as_deref(), rev.as_deref())?;
            if dest.is_some() {
                println!("File saved to: {}", file.name);
                println!("mime: {}", file.mime.as_deref().unwrap_or("unknown"));
                print_json(&file.meta);
            } else {
                io::stdout().write_all(&file.data)?;
            }
        }
        Command::Upload {
            file,
            dest,
            name,
            no_overwrite,
        } => {
            let meta = client.put_file(&file, &dest, name.as_deref(), !no_overwrite)?;
            println!("File successfully uploaded!");
            print_json(&meta);
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}
