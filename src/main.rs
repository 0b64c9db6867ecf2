use ichat::api::auth::IdentityClient;
use ichat::api::client::FirestoreClient;
use ichat::api::events::FeedEvent;
use ichat::api::media::CloudinaryClient;
use ichat::api::models::Conversation;
use ichat::app::{Account, AppConfig};
use ichat::conversations::filter_by_name;
use ichat::session::{Services, Session};
use ichat::storage::Cache;
use std::sync::Arc;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = AppConfig::load();
    if let Err(e) = cfg.validate() {
        let path = AppConfig::toml_path().map(|p| p.display().to_string()).unwrap_or_default();
        log::error!("{e} (edit {path})");
        std::process::exit(2);
    }
    let Some(account) = cfg.account.clone() else {
        log::error!("no [account] section with phone and password in config");
        std::process::exit(2);
    };
    let search = std::env::args().nth(1).unwrap_or_default();

    if let Err(e) = ichat::utils::RUNTIME.block_on(run(cfg, account, search)) {
        let (title, message) = e.notice();
        log::error!("{title}: {message}");
        std::process::exit(1);
    }
}

fn print_conversations(conversations: &[Conversation], search: &str) {
    for c in filter_by_name(conversations, search) {
        let when = chrono::DateTime::from_timestamp(c.last_timestamp, 0)
            .filter(|_| c.last_timestamp > 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "[{}] {:<24} {:>16}  {}",
            ichat::avatar::initial(&c.display_name),
            c.display_name,
            when,
            c.last_message_summary
        );
    }
    println!();
}

async fn run(cfg: AppConfig, account: Account, search: String) -> ichat::Result<()> {
    let services = Services {
        identity: Arc::new(IdentityClient::new(&cfg.auth_url, &cfg.api_key)),
        store: Arc::new(FirestoreClient::new(&cfg.firestore_url, &cfg.project_id)),
        media: Arc::new(CloudinaryClient::new(&cfg.media_url, &cfg.cloud_name, &cfg.upload_preset)),
    };

    let mut cache = match Cache::open_default() {
        Ok(cache) => Some(cache),
        Err(e) => {
            log::warn!("running without local cache: {e}");
            None
        }
    };
    if let Some(cached) = cache.as_ref().and_then(|c| c.get_conversations(Some(200)).ok()) {
        if !cached.is_empty() {
            print_conversations(&cached, &search);
        }
    }

    let mut session = Session::login(services, &account.phone, &account.password).await?;

    let directory = match session.load_directory().await {
        Ok(directory) => {
            if let Some(cache) = cache.as_mut() {
                if let Err(e) = cache.upsert_users(&directory) {
                    log::warn!("could not cache users: {e}");
                }
            }
            directory
        }
        Err(e) => {
            log::warn!("Failed to load users: {e}");
            match cache.as_ref() {
                Some(cache) => cache.load_directory()?,
                None => Default::default(),
            }
        }
    };

    let mut feed = session.subscribe_messages(cfg.poll_interval());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = feed.changed() => match event {
                None => break,
                Some(FeedEvent::Snapshot(messages)) => {
                    let conversations = session.conversations(&messages, &directory);
                    if let Some(cache) = cache.as_mut() {
                        if let Err(e) = cache.replace_conversations(&conversations) {
                            log::warn!("could not cache conversations: {e}");
                        }
                    }
                    print_conversations(&conversations, &search);
                }
                Some(FeedEvent::Failed(notice)) => log::warn!("Failed to load messages: {notice}"),
                Some(FeedEvent::Pending) => {}
            }
        }
    }

    drop(feed);
    session.sign_out().await
}
