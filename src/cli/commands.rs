//! Command implementations for the Glass CLI.

use crate::{
    cli::utils::{first_name_of, format_timestamp, random_subset, unique_names},
    forum::{ForumStorage, ProfileForm},
    GlassError, Result,
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Password given to every generated user.
pub const SEED_PASSWORD: &str = "user";

/// Email given to every generated user.
pub const SEED_EMAIL: &str = "foo@example.org";

const SEED_LAST_NAME: &str = "Smith";

const USER_NAMES: &[&str] = &[
    "nina", "rick", "dick", "brown", "mary", "anna", "antonio", "boba", "michael", "rosa", "alex",
    "bruno", "alfred", "nikolay", "ivan", "mark", "elvis", "joseph", "ricardo", "eleniovey",
];

const TAG_NAMES: &[&str] = &[
    "news",
    "music",
    "politics",
    "nonsense",
    "hacking",
    "racking",
    "health",
    "in-pictures",
];

const TOPIC_TITLES: &[&str] = &[
    "Life on Mars?",
    "Disaster in South Africa",
    "Evil flute player kills a cat",
    "Evangelism as way of life",
    "Radiation can give you new feelings",
    "Learn a Haskell and make a basket",
    "Unbelievable power of rats",
    "Infection in South Africa",
    "Love cannot bear",
    "Hunky Dory",
    "Honesty can lead to impotency",
    "More refuges have been destroyed in South Africa",
    "Red Sails (the contest if open!)",
    "Previously unknown insects kill people in South Africa",
    "New kind of nuke bombs has been invented in Russia",
    "You better think before ridiculing your boss",
    "Ultrasonic vibrations can increase",
    "It has grown much bigger than I hoped!",
];

const MESSAGES: &[&str] = &[
    "Cannot imagine this topic is interesting.",
    "I don't wanna die, so let's address this while we can!",
    "Well, I don't know a lot about this, it's dirty.",
    "We should not support this sort of behavior here.",
    "I don't think so.",
    "Disagree. This is *quite* interesting.",
    "Is that a joke?",
    "This makes me choke.",
    "Oh, that's one big mess.",
    "I've never been to South Africa, but it seems it's hard to live there.",
    "Press <kbd>Ctrl+4</kbd> and you're done!",
];

const LICENSE: &str = "\
glass - administration tool of the Glass forum

Glass is free software: you can redistribute it and/or modify it under the
terms of the GNU General Public License as published by the Free Software
Foundation, either version 3 of the License, or (at your option) any later
version.

Glass is distributed in the hope that it will be useful, but WITHOUT ANY
WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
details.

You should have received a copy of the GNU General Public License along
with this program. If not, see <http://www.gnu.org/licenses/>.
";

/// How many entities of each kind `populate` should add.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateCounts {
    pub users: usize,
    pub tags: usize,
    pub topics: usize,
    pub messages: usize,
}

/// Execute populate command
pub fn populate<R: Rng>(storage: &ForumStorage, counts: PopulateCounts, rng: &mut R) -> Result<()> {
    println!("Starting Glass population script…");
    with_comments(counts.users, "users", |n| populate_users(storage, n, rng))?;
    with_comments(counts.tags, "tags", |n| populate_tags(storage, n, rng))?;
    with_comments(counts.topics, "topics", |n| populate_topics(storage, n, rng))?;
    with_comments(counts.messages, "messages", |n| {
        populate_messages(storage, n, rng)
    })?;
    Ok(())
}

fn with_comments<F>(count: usize, what: &str, generate: F) -> Result<()>
where
    F: FnOnce(usize) -> Result<()>,
{
    if count == 0 {
        return Ok(());
    }
    println!("Creating {} {}…", count, what);
    generate(count)?;
    println!("Done: {} {} created.", count, what);
    Ok(())
}

/// Creates `count` users named like `nina12`, password [`SEED_PASSWORD`].
pub fn populate_users<R: Rng>(storage: &ForumStorage, count: usize, rng: &mut R) -> Result<()> {
    let start = storage.stats()?.users;
    let names = unique_names(rng, USER_NAMES, "", start, count, |name| {
        storage.user_exists(name)
    })?;

    for username in names {
        storage.create_user(&username, SEED_PASSWORD, SEED_EMAIL, false)?;
        let profile = ProfileForm {
            first_name: first_name_of(&username),
            last_name: SEED_LAST_NAME.to_string(),
            email: SEED_EMAIL.to_string(),
        };
        storage.update_profile(&username, &profile)?;
        debug!(username = %username, "Generated user");
    }
    Ok(())
}

/// Creates `count` tags named like `news3`.
pub fn populate_tags<R: Rng>(storage: &ForumStorage, count: usize, rng: &mut R) -> Result<()> {
    let start = storage.stats()?.tags;
    let names = unique_names(rng, TAG_NAMES, "", start, count, |name| {
        storage.tag_exists(name)
    })?;

    for name in names {
        storage.create_tag(&name)?;
    }
    Ok(())
}

/// Creates `count` topics, each carrying one to three existing tags and an
/// initial message by a random user.
pub fn populate_topics<R: Rng>(storage: &ForumStorage, count: usize, rng: &mut R) -> Result<()> {
    let users = storage.list_users()?;
    if users.is_empty() {
        return Err(GlassError::validation(
            "Topics need an author: create some users first",
        ));
    }
    let tags: Vec<String> = storage
        .list_tags()?
        .into_iter()
        .map(|tag| tag.name)
        .collect();

    let start = storage.stats()?.topics;
    let titles = unique_names(rng, TOPIC_TITLES, " ", start, count, |title| {
        storage.slug_exists(&crate::forum::slugify(title))
    })?;

    for title in titles {
        let topic_tags: BTreeSet<String> = random_subset(rng, &tags, 1, 3)
            .into_iter()
            .cloned()
            .collect();
        let author = pick(rng, &users)?;
        let content = pick(rng, MESSAGES)?;
        let (topic, _) = storage.create_topic(&title, &topic_tags, &author.username, content)?;
        debug!(slug = topic.slug(), "Generated topic");
    }
    Ok(())
}

/// Creates `count` messages in random topics by random users, each liked by
/// up to ten random users.
pub fn populate_messages<R: Rng>(storage: &ForumStorage, count: usize, rng: &mut R) -> Result<()> {
    let users = storage.list_users()?;
    let topics = storage.list_topics()?;
    if users.is_empty() || topics.is_empty() {
        return Err(GlassError::validation(
            "Messages need users and topics: create some first",
        ));
    }

    for _ in 0..count {
        let author = pick(rng, &users)?;
        let topic = pick(rng, &topics)?;
        let content = pick(rng, MESSAGES)?;
        let message = storage.post_message(topic.id, &author.username, content)?;
        for liker in random_subset(rng, &users, 0, 10) {
            storage.toggle_like(message.id, &liker.username)?;
        }
    }
    Ok(())
}

fn pick<'a, T, R: Rng>(rng: &mut R, items: &'a [T]) -> Result<&'a T> {
    items
        .choose(rng)
        .ok_or_else(|| GlassError::validation("Nothing to choose from"))
}

/// Execute add-user command
pub fn add_user(
    storage: &ForumStorage,
    username: &str,
    password: &str,
    email: &str,
    staff: bool,
) -> Result<()> {
    let user = storage.create_user(username, password, email, staff)?;
    info!(
        username = %user.username,
        is_staff = user.is_staff,
        joined = format_timestamp(user.date_joined),
        "✅ Created user"
    );
    Ok(())
}

/// Execute set-staff command
pub fn set_staff(storage: &ForumStorage, username: &str, is_staff: bool) -> Result<()> {
    let user = storage.set_staff(username, is_staff)?;
    info!(username = %user.username, is_staff = user.is_staff, "Updated user");
    Ok(())
}

/// Execute add-tag command
pub fn add_tag(storage: &ForumStorage, name: &str) -> Result<()> {
    storage.create_tag(name)?;
    Ok(())
}

/// Execute remove-tag command
pub fn remove_tag(storage: &ForumStorage, name: &str) -> Result<()> {
    if !storage.delete_tag(name)? {
        return Err(GlassError::not_found(format!("tag '{}'", name)));
    }
    Ok(())
}

/// Execute stats command
pub fn stats(storage: &ForumStorage) -> Result<()> {
    let stats = storage.stats()?;
    println!("users:    {}", stats.users);
    println!("tags:     {}", stats.tags);
    println!("topics:   {}", stats.topics);
    println!("messages: {}", stats.messages);
    Ok(())
}

/// Execute license command
pub fn license() {
    print!("{}", LICENSE);
}
