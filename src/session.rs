//! A signed-in user and the actions available to them.

use crate::api::events::{self, FeedHandle, MESSAGES};
use crate::api::media::mime_for;
use crate::api::models::{AttachmentType, Conversation, DeviceContact, MatchedContact, Message, Timestamp, User};
use crate::api::{AuthSession, DocumentStore, IdentityProvider, MediaHost, UploadFile};
use crate::contacts::match_contacts;
use crate::conversations::ConversationIndex;
use crate::directory::UserDirectory;
use crate::error::{AuthError, Result, ValidationError};
use crate::phone::Identity;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const USERS: &str = "users";
const EMAIL_DOMAIN: &str = "ichat.com";
const CREATED_AT: &str = "createdAt";

/// The three hosted services, shared between sessions.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub media: Arc<dyn MediaHost>,
}

/// An attachment picked by the user.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub kind: AttachmentType,
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// MIME type reported by the picker, if any.
    pub mime: Option<String>,
}

pub struct Session {
    services: Services,
    auth: AuthSession,
    me: Identity,
    profile: User,
    index: ConversationIndex,
}

fn require<'a>(value: &'a str, field: &'static str) -> std::result::Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() { Err(ValidationError::MissingField(field)) } else { Ok(trimmed) }
}

fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Numeric form when the number fits, as older user documents store phones as integers.
fn phone_value(id: &Identity) -> Value {
    match id.as_number() {
        Some(n) => json!(n),
        None => json!(id.as_str()),
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Look a user up by phone, trying the numeric form first and then the string form.
async fn find_user(store: &dyn DocumentStore, id: &Identity) -> Result<Option<User>> {
    let mut candidates = vec![phone_value(id)];
    if id.as_number().is_some() {
        candidates.push(json!(id.as_str()));
    }
    for value in candidates {
        let docs = store.query_eq(USERS, "phone", &value, None).await?;
        if let Some(doc) = docs.first() {
            return Ok(Some(doc.decode::<User>("uid")?));
        }
    }
    Ok(None)
}

impl Session {
    pub async fn login(services: Services, phone: &str, password: &str) -> Result<Self> {
        let phone = require(phone, "phone")?;
        require(password, "password")?;
        let me = Identity::parse(phone).ok_or(ValidationError::MissingField("phone"))?;

        let user = find_user(services.store.as_ref(), &me)
            .await?
            .ok_or(AuthError::UnregisteredIdentity)?;
        let email = user
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AuthError::Rejected("user record has no email".into()))?;
        let auth = services.identity.sign_in(&email, password).await?;
        log::info!("signed in as {me}");
        let index = ConversationIndex::new(me.clone());
        Ok(Self { services, auth, me, profile: user, index })
    }

    pub async fn register(services: Services, name: &str, phone: &str, password: &str) -> Result<Self> {
        let name = require(name, "name")?;
        let phone = require(phone, "phone")?;
        require(password, "password")?;
        let me = Identity::parse(phone).ok_or(ValidationError::MissingField("phone"))?;

        if find_user(services.store.as_ref(), &me).await?.is_some() {
            return Err(ValidationError::DuplicateRegistration.into());
        }

        let email = format!("{me}@{EMAIL_DOMAIN}");
        let auth = match services.identity.sign_up(&email, password).await {
            Err(AuthError::Rejected(code)) if code == "EMAIL_EXISTS" => {
                return Err(ValidationError::DuplicateRegistration.into());
            }
            other => other?,
        };
        services.identity.update_display_name(&auth, name).await?;

        let fields = object(json!({ "name": name, "email": email, "phone": phone_value(&me) }));
        services.store.replace(USERS, &auth.uid, fields, Some(&auth.id_token)).await?;
        log::info!("registered {me}");

        let profile = User {
            uid: auth.uid.clone(),
            name: Some(name.to_string()),
            email: Some(email),
            phone: Some(me.to_string()),
            profile_pic: None,
        };
        let index = ConversationIndex::new(me.clone());
        Ok(Self { services, auth, me, profile, index })
    }

    pub fn me(&self) -> &Identity {
        &self.me
    }

    pub fn profile(&self) -> &User {
        &self.profile
    }

    fn token(&self) -> Option<&str> {
        Some(&self.auth.id_token)
    }

    /// Post a message and fold it into the conversation list ahead of the next snapshot.
    async fn add_message(&mut self, to: &Identity, fields: Value) -> Result<Message> {
        let mut fields = object(fields);
        fields.insert("from".into(), json!(self.me.as_str()));
        fields.insert("chatWith".into(), json!(to.as_str()));
        let id = self.services.store.add(MESSAGES, fields.clone(), Some(CREATED_AT), self.token()).await?;
        fields.insert("id".into(), json!(id));
        // The store assigns the real time; the local copy uses ours until the next snapshot.
        fields.insert(CREATED_AT.into(), serde_json::to_value(Timestamp { seconds: unix_now(), nanos: 0 }).unwrap_or_default());
        let msg: Message = serde_json::from_value(Value::Object(fields))
            .map_err(|e| crate::error::QueryError::Decode(e.to_string()))?;
        self.index.apply(&msg);
        Ok(msg)
    }

    pub async fn send_text(&mut self, to: &Identity, text: &str) -> Result<Message> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        self.add_message(to, json!({ "text": text })).await
    }

    /// Upload the file, then post a message pointing at it.
    /// A blank file name is stored as null; the upload itself still needs a name.
    pub async fn send_attachment(&mut self, to: &Identity, attachment: Attachment) -> Result<Message> {
        let stored_name = Some(attachment.file_name.trim().to_string()).filter(|n| !n.is_empty());
        let upload_name = stored_name.clone().unwrap_or_else(|| {
            let ext = match attachment.kind {
                AttachmentType::Image => "jpg",
                AttachmentType::Doc => "bin",
            };
            format!("upload.{ext}")
        });
        let mime = mime_for(stored_name.as_deref().unwrap_or_default(), attachment.kind, attachment.mime.as_deref());
        let upload = UploadFile { bytes: attachment.bytes, file_name: upload_name, mime };
        let url = self.services.media.upload(upload, attachment.kind).await?;

        self.add_message(
            to,
            json!({
                "text": "",
                "attachmentUrl": url,
                "attachmentType": attachment.kind.as_str(),
                "fileName": stored_name,
            }),
        )
        .await
    }

    /// Upload a new avatar and record it on the user document.
    pub async fn set_profile_picture(&mut self, bytes: Vec<u8>) -> Result<String> {
        let upload = UploadFile {
            bytes,
            file_name: format!("profile_pic_{}.jpg", unix_now()),
            mime: "image/jpeg".to_string(),
        };
        let url = self.services.media.upload(upload, AttachmentType::Image).await?;
        let fields = object(json!({ "profilePic": url }));
        self.services.store.merge(USERS, &self.auth.uid, fields, self.token()).await?;
        self.profile.profile_pic = Some(url.clone());
        Ok(url)
    }

    /// Re-read this user's document, e.g. after the avatar changed elsewhere.
    pub async fn refresh_profile(&mut self) -> Result<&User> {
        if let Some(doc) = self.services.store.get(USERS, &self.auth.uid, self.token()).await? {
            self.profile = doc.decode::<User>("uid")?;
        }
        Ok(&self.profile)
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>> {
        let docs = self.services.store.list(USERS, self.token()).await?;
        let mut users = Vec::with_capacity(docs.len());
        for doc in &docs {
            match doc.decode::<User>("uid") {
                Ok(user) => users.push(user),
                Err(e) => log::debug!("skipping user {}: {e}", doc.id),
            }
        }
        Ok(users)
    }

    pub async fn load_directory(&self) -> Result<UserDirectory> {
        Ok(UserDirectory::from_users(&self.fetch_users().await?))
    }

    pub async fn matched_contacts(&self, local: &[DeviceContact]) -> Result<Vec<MatchedContact>> {
        Ok(match_contacts(local, &self.fetch_users().await?))
    }

    pub fn subscribe_messages(&self, interval: Duration) -> FeedHandle {
        events::subscribe(self.services.store.clone(), Some(self.auth.id_token.clone()), interval)
    }

    /// Rebuild the conversation list from a full feed snapshot.
    pub fn conversations(&mut self, snapshot: &[Message], directory: &UserDirectory) -> Vec<Conversation> {
        self.index = ConversationIndex::from_messages(self.me.clone(), snapshot);
        self.index.snapshot(directory)
    }

    /// The current list, including messages sent since the last snapshot.
    pub fn conversation_list(&self, directory: &UserDirectory) -> Vec<Conversation> {
        self.index.snapshot(directory)
    }

    pub async fn sign_out(self) -> Result<()> {
        self.services.identity.sign_out(&self.auth).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::firestore::Document;
    use crate::error::{Error, QueryError, UploadError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeIdentity {
        accounts: Mutex<Vec<(String, String, String)>>,
        display_names: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn sign_in(&self, email: &str, password: &str) -> std::result::Result<AuthSession, AuthError> {
            let accounts = self.accounts.lock().unwrap();
            accounts
                .iter()
                .find(|(e, p, _)| e == email && p == password)
                .map(|(e, _, uid)| AuthSession {
                    uid: uid.clone(),
                    email: e.clone(),
                    id_token: format!("tok-{uid}"),
                    refresh_token: None,
                })
                .ok_or(AuthError::BadCredential)
        }
        async fn sign_up(&self, email: &str, password: &str) -> std::result::Result<AuthSession, AuthError> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.iter().any(|(e, _, _)| e == email) {
                return Err(AuthError::Rejected("EMAIL_EXISTS".into()));
            }
            let uid = format!("uid{}", accounts.len());
            accounts.push((email.into(), password.into(), uid.clone()));
            Ok(AuthSession { uid: uid.clone(), email: email.into(), id_token: format!("tok-{uid}"), refresh_token: None })
        }
        async fn update_display_name(&self, _: &AuthSession, name: &str) -> std::result::Result<(), AuthError> {
            self.display_names.lock().unwrap().push(name.into());
            Ok(())
        }
        async fn sign_out(&self, _: &AuthSession) -> std::result::Result<(), AuthError> {
            Ok(())
        }
    }

    /// Collections of plain-JSON documents.
    #[derive(Default)]
    struct MemoryStore {
        docs: Mutex<Vec<(String, Document)>>,
        tokens: Mutex<Vec<Option<String>>>,
    }

    impl MemoryStore {
        fn insert(&self, collection: &str, id: &str, fields: Value) {
            self.docs
                .lock()
                .unwrap()
                .push((collection.into(), Document { id: id.into(), fields: object(fields) }));
        }

        fn write(&self, collection: &str, id: &str, fields: Map<String, Value>, merge: bool) {
            let mut docs = self.docs.lock().unwrap();
            match docs.iter_mut().find(|(c, d)| c == collection && d.id == id) {
                Some((_, doc)) if merge => doc.fields.extend(fields),
                Some((_, doc)) => doc.fields = fields,
                None => docs.push((collection.into(), Document { id: id.into(), fields })),
            }
        }

        fn collection(&self, collection: &str) -> Vec<Document> {
            self.docs.lock().unwrap().iter().filter(|(c, _)| c == collection).map(|(_, d)| d.clone()).collect()
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn list(&self, collection: &str, token: Option<&str>) -> std::result::Result<Vec<Document>, QueryError> {
            self.tokens.lock().unwrap().push(token.map(str::to_string));
            Ok(self.collection(collection))
        }
        async fn query_eq(&self, collection: &str, field: &str, value: &Value, _: Option<&str>) -> std::result::Result<Vec<Document>, QueryError> {
            Ok(self.collection(collection).into_iter().filter(|d| d.fields.get(field) == Some(value)).collect())
        }
        async fn get(&self, collection: &str, id: &str, _: Option<&str>) -> std::result::Result<Option<Document>, QueryError> {
            Ok(self.collection(collection).into_iter().find(|d| d.id == id))
        }
        async fn add(&self, collection: &str, mut fields: Map<String, Value>, server_time_field: Option<&str>, token: Option<&str>) -> std::result::Result<String, QueryError> {
            self.tokens.lock().unwrap().push(token.map(str::to_string));
            if let Some(f) = server_time_field {
                fields.insert(f.into(), json!({ "seconds": 1_000, "nanos": 0 }));
            }
            let id = format!("m{}", self.docs.lock().unwrap().len());
            self.insert(collection, &id, Value::Object(fields));
            Ok(id)
        }
        async fn merge(&self, collection: &str, id: &str, fields: Map<String, Value>, _: Option<&str>) -> std::result::Result<(), QueryError> {
            self.write(collection, id, fields, true);
            Ok(())
        }
        async fn replace(&self, collection: &str, id: &str, fields: Map<String, Value>, _: Option<&str>) -> std::result::Result<(), QueryError> {
            self.write(collection, id, fields, false);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeMedia {
        uploads: Mutex<Vec<(String, String, AttachmentType)>>,
        fail: bool,
    }

    #[async_trait]
    impl MediaHost for FakeMedia {
        async fn upload(&self, file: UploadFile, kind: AttachmentType) -> std::result::Result<String, UploadError> {
            if self.fail {
                return Err(UploadError::Rejected("too large".into()));
            }
            self.uploads.lock().unwrap().push((file.file_name.clone(), file.mime.clone(), kind));
            Ok(format!("https://cdn.example/{}", file.file_name))
        }
    }

    struct Harness {
        identity: Arc<FakeIdentity>,
        store: Arc<MemoryStore>,
        media: Arc<FakeMedia>,
    }

    impl Harness {
        fn new(media: FakeMedia) -> Self {
            Self { identity: Arc::default(), store: Arc::default(), media: Arc::new(media) }
        }

        fn services(&self) -> Services {
            Services { identity: self.identity.clone(), store: self.store.clone(), media: self.media.clone() }
        }

        /// A user registered the way older clients did: numeric phone, no stored identity.
        fn seed_user(&self, uid: &str, name: &str, phone: i64, password: &str) {
            let email = format!("{phone}@ichat.com");
            self.store.insert(USERS, uid, json!({ "name": name, "email": email, "phone": phone }));
            self.identity.accounts.lock().unwrap().push((email, password.into(), uid.into()));
        }
    }

    #[tokio::test]
    async fn login_looks_up_the_email_by_phone() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");
        let session = Session::login(h.services(), "+91 99900 01111", "pw").await.unwrap();
        assert_eq!(session.me().as_str(), "9990001111");
        assert_eq!(session.profile().name.as_deref(), Some("Me"));
    }

    #[tokio::test]
    async fn login_with_string_phone_falls_back_to_string_query() {
        let h = Harness::new(FakeMedia::default());
        h.store.insert(USERS, "u2", json!({ "name": "S", "email": "s@ichat.com", "phone": "8880002222" }));
        h.identity.accounts.lock().unwrap().push(("s@ichat.com".into(), "pw".into(), "u2".into()));
        assert!(Session::login(h.services(), "8880002222", "pw").await.is_ok());
    }

    #[tokio::test]
    async fn login_errors() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");

        let err = Session::login(h.services(), "1234567890", "pw").await.err().unwrap();
        assert!(matches!(err, Error::Auth(AuthError::UnregisteredIdentity)));

        let err = Session::login(h.services(), "9990001111", "wrong").await.err().unwrap();
        assert!(matches!(err, Error::Auth(AuthError::BadCredential)));

        let err = Session::login(h.services(), "9990001111", "  ").await.err().unwrap();
        assert!(matches!(err, Error::Validation(ValidationError::MissingField("password"))));
    }

    #[tokio::test]
    async fn register_writes_the_user_document() {
        let h = Harness::new(FakeMedia::default());
        let session = Session::register(h.services(), "Asha", "7770003333", "pw").await.unwrap();
        assert_eq!(session.profile().email.as_deref(), Some("7770003333@ichat.com"));
        assert_eq!(h.identity.display_names.lock().unwrap().as_slice(), ["Asha"]);

        let users = h.store.collection(USERS);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].fields["phone"], json!(7770003333_i64));

        // The stored phone makes the account reachable by login.
        assert!(Session::login(h.services(), "7770003333", "pw").await.is_ok());
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_blank_fields() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");
        let err = Session::register(h.services(), "Again", "9990001111", "pw").await.err().unwrap();
        assert!(matches!(err, Error::Validation(ValidationError::DuplicateRegistration)));

        let err = Session::register(h.services(), "", "1112223333", "pw").await.err().unwrap();
        assert!(matches!(err, Error::Validation(ValidationError::MissingField("name"))));
    }

    #[tokio::test]
    async fn register_maps_provider_duplicate_to_validation() {
        let h = Harness::new(FakeMedia::default());
        // Account exists at the provider but its user document was never written.
        h.identity.accounts.lock().unwrap().push(("1112223333@ichat.com".into(), "x".into(), "orphan".into()));
        let err = Session::register(h.services(), "Late", "1112223333", "pw").await.err().unwrap();
        assert!(matches!(err, Error::Validation(ValidationError::DuplicateRegistration)));
    }

    #[tokio::test]
    async fn sending_text_feeds_the_conversation_list() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");
        h.seed_user("u2", "Bob", 8880002222, "pw2");
        let mut session = Session::login(h.services(), "9990001111", "pw").await.unwrap();
        let bob = Identity::parse("8880002222").unwrap();

        let sent = session.send_text(&bob, "hello").await.unwrap();
        assert_eq!(sent.chat_with, "8880002222");
        assert!(sent.created_at.is_some());
        assert!(matches!(
            session.send_text(&bob, "   ").await,
            Err(Error::Validation(ValidationError::EmptyMessage))
        ));

        let snapshot = events::fetch_messages(h.store.as_ref(), None).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].seconds(), 1_000);

        let directory = session.load_directory().await.unwrap();
        let convs = session.conversations(&snapshot, &directory);
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].display_name, "Bob");
        assert_eq!(convs[0].last_message_summary, "hello");

        let tokens = h.store.tokens.lock().unwrap();
        assert!(tokens.iter().any(|t| t.as_deref() == Some("tok-u1")));
    }

    #[tokio::test]
    async fn attachments_upload_before_posting() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");
        let mut session = Session::login(h.services(), "9990001111", "pw").await.unwrap();
        let bob = Identity::parse("8880002222").unwrap();

        let doc = Attachment { kind: AttachmentType::Doc, file_name: "notes.pdf".into(), bytes: vec![1, 2, 3], mime: None };
        let msg = session.send_attachment(&bob, doc).await.unwrap();
        assert_eq!(msg.attachment_url.as_deref(), Some("https://cdn.example/notes.pdf"));
        assert_eq!(msg.attachment_type, Some(AttachmentType::Doc));
        assert_eq!(msg.summary(), "doc attachment");

        let uploads = h.media.uploads.lock().unwrap();
        assert_eq!(uploads[0], ("notes.pdf".to_string(), "application/pdf".to_string(), AttachmentType::Doc));
    }

    #[tokio::test]
    async fn unnamed_attachment_is_stored_without_a_file_name() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");
        let mut session = Session::login(h.services(), "9990001111", "pw").await.unwrap();
        let bob = Identity::parse("8880002222").unwrap();

        let img = Attachment { kind: AttachmentType::Image, file_name: "  ".into(), bytes: vec![0], mime: None };
        let msg = session.send_attachment(&bob, img).await.unwrap();
        assert_eq!(msg.file_name, None);
        assert_eq!(msg.attachment_url.as_deref(), Some("https://cdn.example/upload.jpg"));

        let stored = h.store.collection(MESSAGES);
        assert_eq!(stored[0].fields["fileName"], Value::Null);
        assert_eq!(h.media.uploads.lock().unwrap()[0].1, "image/jpeg");
    }

    #[tokio::test]
    async fn sent_messages_update_the_list_before_the_next_snapshot() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");
        h.seed_user("u2", "Bob", 8880002222, "pw2");
        h.seed_user("u3", "Cara", 7770003333, "pw3");
        let mut session = Session::login(h.services(), "9990001111", "pw").await.unwrap();
        let directory = session.load_directory().await.unwrap();
        let bob = Identity::parse("8880002222").unwrap();
        let cara = Identity::parse("7770003333").unwrap();

        session.send_text(&bob, "first").await.unwrap();
        let snapshot = events::fetch_messages(h.store.as_ref(), None).await.unwrap();
        assert_eq!(session.conversations(&snapshot, &directory).len(), 1);

        session.send_text(&cara, "fresh").await.unwrap();
        let list = session.conversation_list(&directory);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Cara");
        assert_eq!(list[0].last_message_summary, "fresh");
    }

    #[tokio::test]
    async fn failed_upload_posts_nothing() {
        let h = Harness::new(FakeMedia { fail: true, ..FakeMedia::default() });
        h.seed_user("u1", "Me", 9990001111, "pw");
        let mut session = Session::login(h.services(), "9990001111", "pw").await.unwrap();
        let bob = Identity::parse("8880002222").unwrap();
        let img = Attachment { kind: AttachmentType::Image, file_name: "a.png".into(), bytes: vec![0], mime: None };

        let err = session.send_attachment(&bob, img).await.err().unwrap();
        assert!(matches!(err, Error::Upload(UploadError::Rejected(_))));
        assert!(h.store.collection(MESSAGES).is_empty());
    }

    #[tokio::test]
    async fn profile_picture_is_merged_into_the_user_document() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");
        let mut session = Session::login(h.services(), "9990001111", "pw").await.unwrap();

        let url = session.set_profile_picture(vec![9; 4]).await.unwrap();
        assert!(url.starts_with("https://cdn.example/profile_pic_"));
        let users = h.store.collection(USERS);
        assert_eq!(users[0].fields["profilePic"], json!(url));
        assert_eq!(users[0].fields["name"], json!("Me"));
        assert_eq!(session.profile().profile_pic.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn refresh_profile_reads_the_user_document() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");
        let mut session = Session::login(h.services(), "9990001111", "pw").await.unwrap();
        let mut patch = Map::new();
        patch.insert("profilePic".into(), json!("https://cdn.example/new.jpg"));
        h.store.merge(USERS, "u1", patch, None).await.unwrap();

        let profile = session.refresh_profile().await.unwrap();
        assert_eq!(profile.profile_pic.as_deref(), Some("https://cdn.example/new.jpg"));
        assert_eq!(profile.uid, "u1");
    }

    #[tokio::test]
    async fn contacts_are_matched_against_registered_users() {
        let h = Harness::new(FakeMedia::default());
        h.seed_user("u1", "Me", 9990001111, "pw");
        h.seed_user("u2", "Bob", 8880002222, "pw2");
        let session = Session::login(h.services(), "9990001111", "pw").await.unwrap();
        let local = [
            DeviceContact { id: "c1".into(), name: "Bobby".into(), phone_numbers: vec!["+91 888 000 2222".into()] },
            DeviceContact { id: "c2".into(), name: "Nobody".into(), phone_numbers: vec!["5550001234".into()] },
        ];
        let matched = session.matched_contacts(&local).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].identity.as_str(), "8880002222");
    }
}
