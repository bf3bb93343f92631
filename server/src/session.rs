//! Per-connection session state: the login/creation state machine and the
//! attach/detach of characters to the live world. Sessions live inside the
//! game loop; the network tasks only deliver lines.

use ashenmoor_core::colors::colorize;
use ashenmoor_core::constants::{MAX_PASSWORD_ATTEMPTS, RESPAWN_ROOM_ID};
use ashenmoor_core::slots::WearSlot;

use crate::character::Character;
use crate::creation::{CreationEvent, CreationFlow};
use crate::credential::CredentialVerifier;
use crate::db::accounts::AccountRow;
use crate::item::ItemInstance;
use crate::net::Outbox;
use crate::world::World;
use crate::{CharacterId, SessionId};

const MOTD: &str = "\r\n{W--- Welcome to Ashenmoor (alpha) ---{x\r\n\
The vale remembers every soul that walks it.\r\n\
Type 'help' once you are in the world.\r\n\
{W------------------------------------{x";

pub enum SessionState {
    GettingUsername,
    GettingPassword,
    AskCreateAccount,
    GettingNewEmail,
    GettingNewPassword,
    ConfirmNewPassword,
    SelectingCharacter { menu: Vec<CharacterId> },
    CreatingCharacter(Box<CreationFlow>),
    Playing,
    Disconnected,
}

/// Borrow-free view of the state machine's position, so dispatch can hand
/// `&mut self` to the step methods.
#[derive(Clone, Copy, PartialEq, Eq)]
enum StateKind {
    Username,
    Password,
    AskCreate,
    NewEmail,
    NewPassword,
    ConfirmPassword,
    Selecting,
    Creating,
    Playing,
    Disconnected,
}

impl SessionState {
    fn kind(&self) -> StateKind {
        match self {
            SessionState::GettingUsername => StateKind::Username,
            SessionState::GettingPassword => StateKind::Password,
            SessionState::AskCreateAccount => StateKind::AskCreate,
            SessionState::GettingNewEmail => StateKind::NewEmail,
            SessionState::GettingNewPassword => StateKind::NewPassword,
            SessionState::ConfirmNewPassword => StateKind::ConfirmPassword,
            SessionState::SelectingCharacter { .. } => StateKind::Selecting,
            SessionState::CreatingCharacter(_) => StateKind::Creating,
            SessionState::Playing => StateKind::Playing,
            SessionState::Disconnected => StateKind::Disconnected,
        }
    }
}

pub struct Session {
    pub id: SessionId,
    pub addr: String,
    pub outbox: Outbox,
    pub state: SessionState,
    pub account: Option<AccountRow>,
    pub character_id: Option<CharacterId>,
    password_attempts: u32,
    pending_username: String,
    pending_email: String,
    pending_password: String,
}

impl Session {
    pub fn new(id: SessionId, addr: String, outbox: Outbox) -> Session {
        Session {
            id,
            addr,
            outbox,
            state: SessionState::GettingUsername,
            account: None,
            character_id: None,
            password_attempts: 0,
            pending_username: String::new(),
            pending_email: String::new(),
            pending_password: String::new(),
        }
    }

    /// Write a line to this session directly (pre-play states have no
    /// character to route through).
    pub fn send(&self, message: &str) {
        let mut rendered = colorize(message);
        if !rendered.ends_with('\n') {
            rendered.push_str("\r\n");
        }
        let _ = self.outbox.send(rendered);
    }

    pub fn send_raw(&self, message: &str) {
        let _ = self.outbox.send(colorize(message));
    }

    pub fn greet(&self) {
        self.send("{WAshenmoor awaits.{x");
        self.send_raw("Enter your account name: ");
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, SessionState::Playing)
    }

    /// Drive the pre-play state machine with one input line. Returns false
    /// when the session should be torn down.
    pub async fn handle_login_line(
        &mut self,
        world: &mut World,
        verifier: &dyn CredentialVerifier,
        line: &str,
    ) -> bool {
        // `quit` during any pre-play state ends the session cleanly. The
        // creation flow handles the word itself (it means "cancel" there).
        let kind = self.state.kind();
        if line.eq_ignore_ascii_case("quit") && kind != StateKind::Creating {
            self.send("Until another night, then.");
            return false;
        }

        match kind {
            StateKind::Username => self.step_username(world, line).await,
            StateKind::Password => self.step_password(world, verifier, line).await,
            StateKind::AskCreate => self.step_ask_create(line).await,
            StateKind::NewEmail => self.step_new_email(line).await,
            StateKind::NewPassword => self.step_new_password(line).await,
            StateKind::ConfirmPassword => self.step_confirm_password(world, verifier, line).await,
            StateKind::Selecting => self.step_select_character(world, line).await,
            StateKind::Creating => self.step_creation(world, line).await,
            StateKind::Playing | StateKind::Disconnected => true,
        }
    }

    async fn step_username(&mut self, world: &mut World, line: &str) -> bool {
        let username = line.trim();
        if username.len() < 3 || username.len() > 20 || !username.chars().all(|c| c.is_ascii_alphanumeric()) {
            self.send("Invalid account name. Use 3-20 letters and numbers only.");
            self.send_raw("Enter your account name: ");
            return true;
        }

        match world.db.load_account(username).await {
            Ok(Some(account)) => {
                log::info!("Account {:?} found for {}", account.username, self.addr);
                self.account = Some(account);
                self.password_attempts = 0;
                self.state = SessionState::GettingPassword;
                self.send_raw("Password: ");
            }
            Ok(None) => {
                self.pending_username = username.to_string();
                self.state = SessionState::AskCreateAccount;
                self.send_raw(&format!("Account '{username}' not found. Create it? (yes/no): "));
            }
            Err(e) => {
                log::error!("Account lookup for {username:?} failed: {e}");
                self.send("An error occurred. Try again.");
                self.send_raw("Enter your account name: ");
            }
        }
        true
    }

    async fn step_password(
        &mut self,
        world: &mut World,
        verifier: &dyn CredentialVerifier,
        line: &str,
    ) -> bool {
        let Some(account) = self.account.clone() else {
            log::error!("Password step without a loaded account on {}", self.addr);
            return false;
        };

        let check = verifier.verify(&account.hashed_password, line);
        if !check.matched {
            self.password_attempts += 1;
            if self.password_attempts >= MAX_PASSWORD_ATTEMPTS {
                self.send("\r\nToo many incorrect attempts. Disconnecting.");
                return false;
            }
            self.send(&format!(
                "\r\nIncorrect password. ({} attempts remaining)",
                MAX_PASSWORD_ATTEMPTS - self.password_attempts
            ));
            self.send_raw("Password: ");
            return true;
        }

        // Legacy hash: persist the upgraded form before announcing success.
        if check.needs_upgrade {
            let new_hash = verifier.hash(line);
            match world.db.update_account_password(account.id, &new_hash).await {
                Ok(()) => {
                    if let Some(acc) = self.account.as_mut() {
                        acc.hashed_password = new_hash;
                    }
                    log::info!("Upgraded stored credential for {:?}", account.username);
                }
                Err(e) => {
                    log::error!("Credential upgrade for {:?} failed: {e}", account.username);
                    self.send("{rNote: your credentials could not be refreshed. Please report this.{x");
                }
            }
        }

        if let Err(e) = world.db.touch_last_login(account.id).await {
            log::debug!("touch_last_login failed for {:?}: {e}", account.username);
        }
        self.send("\r\nPassword accepted.");
        self.enter_character_select(world).await
    }

    async fn step_ask_create(&mut self, line: &str) -> bool {
        match line.to_ascii_lowercase().as_str() {
            "yes" | "y" => {
                self.state = SessionState::GettingNewEmail;
                self.send_raw("Enter your email address: ");
            }
            "no" | "n" => {
                self.pending_username.clear();
                self.state = SessionState::GettingUsername;
                self.send_raw("Enter your account name: ");
            }
            _ => self.send_raw("Please answer 'yes' or 'no': "),
        }
        true
    }

    async fn step_new_email(&mut self, line: &str) -> bool {
        let email = line.trim();
        let plausible = email.contains('@')
            && email.rsplit('@').next().map_or(false, |domain| domain.contains('.'));
        if !plausible {
            self.send("That doesn't look like an email address.");
            self.send_raw("Enter your email address: ");
            return true;
        }
        self.pending_email = email.to_string();
        self.state = SessionState::GettingNewPassword;
        self.send_raw("Choose a password (at least 6 characters): ");
        true
    }

    async fn step_new_password(&mut self, line: &str) -> bool {
        if line.len() < 6 {
            self.send("Password too short.");
            self.send_raw("Choose a password (at least 6 characters): ");
            return true;
        }
        self.pending_password = line.to_string();
        self.state = SessionState::ConfirmNewPassword;
        self.send_raw("Confirm password: ");
        true
    }

    async fn step_confirm_password(
        &mut self,
        world: &mut World,
        verifier: &dyn CredentialVerifier,
        line: &str,
    ) -> bool {
        if line != self.pending_password {
            self.pending_password.clear();
            self.send("Passwords do not match.");
            self.state = SessionState::GettingNewPassword;
            self.send_raw("Choose a password (at least 6 characters): ");
            return true;
        }

        let hash = verifier.hash(&self.pending_password);
        self.pending_password.clear();
        match world
            .db
            .create_account(&self.pending_username, &hash, &self.pending_email)
            .await
        {
            Ok(_) => {
                self.send(&format!("Account '{}' created.", self.pending_username));
                match world.db.load_account(&self.pending_username).await {
                    Ok(Some(account)) => {
                        let player_id = account.id;
                        self.account = Some(account);
                        self.state = SessionState::CreatingCharacter(Box::new(CreationFlow::new(player_id)));
                        self.pump_creation_messages(world);
                        true
                    }
                    _ => {
                        self.send("Error loading your new account. Disconnecting.");
                        false
                    }
                }
            }
            Err(e) => {
                log::warn!("Account creation for {:?} failed: {e}", self.pending_username);
                self.send("Failed to create the account. Perhaps the name was just taken.");
                self.state = SessionState::GettingUsername;
                self.send_raw("Enter your account name: ");
                true
            }
        }
    }

    async fn enter_character_select(&mut self, world: &mut World) -> bool {
        let Some(account) = self.account.clone() else { return false };
        let list = match world.db.list_characters_for_account(account.id).await {
            Ok(list) => list,
            Err(e) => {
                log::error!("Listing characters for {:?} failed: {e}", account.username);
                self.send("An error occurred. Disconnecting.");
                return false;
            }
        };

        if list.is_empty() {
            self.send("\r\nYou have no characters on this account.");
            self.state = SessionState::CreatingCharacter(Box::new(CreationFlow::new(account.id)));
            self.pump_creation_messages(world);
            return true;
        }

        let mut output = vec!["\r\n{W--- Your Characters ---{x".to_string()];
        let mut menu = Vec::new();
        for (i, row) in list.iter().enumerate() {
            menu.push(row.id);
            output.push(format!(
                " {}. {} {} ({} {} {})",
                i + 1,
                row.first_name,
                row.last_name,
                world.race_name(row.race_id.unwrap_or(0)),
                world.class_name(row.class_id.unwrap_or(0)),
                row.level
            ));
        }
        output.push("Enter a number to play, or 'new' to create another:".into());
        self.send(&output.join("\r\n"));
        self.state = SessionState::SelectingCharacter { menu };
        true
    }

    async fn step_select_character(&mut self, world: &mut World, line: &str) -> bool {
        let menu = match &self.state {
            SessionState::SelectingCharacter { menu } => menu.clone(),
            _ => return true,
        };
        let Some(account) = self.account.clone() else { return false };

        if line.eq_ignore_ascii_case("new") {
            self.state = SessionState::CreatingCharacter(Box::new(CreationFlow::new(account.id)));
            self.pump_creation_messages(world);
            return true;
        }

        let pick = match line.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= menu.len() => menu[n - 1],
            _ => {
                self.send("Invalid selection. Enter a number or 'new'.");
                return true;
            }
        };

        self.enter_world(world, pick).await
    }

    async fn step_creation(&mut self, world: &mut World, line: &str) -> bool {
        let SessionState::CreatingCharacter(flow) = &mut self.state else { return true };
        let event = flow.handle_line(world, line);
        self.pump_creation_messages(world);

        match event {
            CreationEvent::Continue => true,
            CreationEvent::Cancelled => {
                self.send("\r\nCreation abandoned. Returning to character selection.");
                self.enter_character_select(world).await
            }
            CreationEvent::Finished(new_character) => {
                match world.db.create_character(&new_character).await {
                    Ok(id) => {
                        self.send(&format!(
                            "\r\n{{GWelcome to the vale, {} {}.{{x",
                            new_character.first_name, new_character.last_name
                        ));
                        self.send(&format!(
                            "Your class grants you proficiency in several skills; you have {} skill points to begin your journey.",
                            new_character.unspent_skill_points
                        ));
                        self.enter_world(world, id).await
                    }
                    Err(e) => {
                        log::error!("Creating character failed: {e}");
                        self.send("Something went wrong writing your character. Try again.");
                        self.enter_character_select(world).await
                    }
                }
            }
        }
    }

    /// Flush queued creation text and, if still creating, the next prompt.
    fn pump_creation_messages(&mut self, world: &World) {
        let SessionState::CreatingCharacter(flow) = &mut self.state else { return };
        for message in flow.messages.drain(..) {
            let mut rendered = colorize(&message);
            if !rendered.ends_with('\n') {
                rendered.push_str("\r\n");
            }
            let _ = self.outbox.send(rendered);
        }
        let prompt = flow.prompt(world);
        let _ = self.outbox.send(colorize(&prompt));
    }

    /// Attach a loaded character to the world: active index, room placement
    /// (room 1 fallback), MOTD, look, arrival broadcast, login stamp.
    async fn enter_world(&mut self, world: &mut World, character_id: CharacterId) -> bool {
        let Some(account) = self.account.clone() else { return false };

        let row = match world.db.load_character(character_id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                self.send("That character seems to be missing.");
                return self.enter_character_select(world).await;
            }
            Err(e) => {
                log::error!("Loading character {character_id} failed: {e}");
                self.send("An error occurred loading the character. Disconnecting.");
                return false;
            }
        };
        if row.player_id != account.id {
            log::warn!(
                "Session {} tried to load character {character_id} belonging to player {}",
                self.addr,
                row.player_id
            );
            self.send("That character is not yours.");
            return self.enter_character_select(world).await;
        }

        let mut character = Character::from_row(&row, account.is_admin);

        // Hydrate held and worn items, plus one level of container contents.
        match world.db.load_items_for_character(character_id).await {
            Ok(rows) => {
                for item_row in &rows {
                    let instance = ItemInstance::from_row(item_row);
                    let contents = world.db.load_items_in_container(instance.id).await;
                    let mut instance = instance;
                    if let Ok(contained) = contents {
                        for inner in &contained {
                            instance.contents.push(inner.id);
                            world.items.insert(inner.id, ItemInstance::from_row(inner));
                        }
                    }
                    match item_row.equipped_slot.as_deref().and_then(WearSlot::parse) {
                        Some(slot) => {
                            character.equipment.insert(slot, instance.id);
                            // Two-handers persist one slot; mirror into the
                            // other hand when the template spans both.
                            if slot == WearSlot::MainHand {
                                if let Some(template) =
                                    world.item_template(instance.template_id)
                                {
                                    if template.wear_slots().len() > 1 {
                                        character.equipment.insert(WearSlot::OffHand, instance.id);
                                    }
                                }
                            }
                        }
                        None => character.inventory.push(instance.id),
                    }
                    world.items.insert(instance.id, instance);
                }
            }
            Err(e) => log::error!("Loading items for character {character_id} failed: {e}"),
        }

        // Place in the persisted room, falling back to room 1.
        let mut room_id = character.location_id;
        if !world.rooms.contains_key(&room_id) {
            log::warn!(
                "Character {} loaded into missing room {room_id}; moving to {RESPAWN_ROOM_ID}",
                character.name
            );
            room_id = RESPAWN_ROOM_ID;
            if !world.rooms.contains_key(&room_id) {
                log::error!("Default room {RESPAWN_ROOM_ID} missing; cannot place {}", character.name);
                self.send("Critical error: the world has no ground to stand on. Disconnecting.");
                return false;
            }
            character.location_id = room_id;
        }

        let name = character.name.clone();
        character.session = Some(self.id);
        character.login_at = Some(world.now());
        world.add_active_character(character, self.outbox.clone());
        if let Some(room) = world.room_mut(room_id) {
            room.characters.insert(character_id);
        }

        self.character_id = Some(character_id);
        self.state = SessionState::Playing;

        world.send_to_char(character_id, MOTD);
        let look = world
            .room(room_id)
            .map(|r| r.look_string(world, character_id));
        if let Some(look) = look {
            world.send_to_char(character_id, &look);
        }
        world.broadcast_room(room_id, &format!("\r\n{name} slowly approaches."), &[character_id]);
        log::info!("Character {name} entered the world in room {room_id}.");

        self.send_prompt(world);
        true
    }

    /// The status prompt printed before every read while playing.
    pub fn send_prompt(&self, world: &World) {
        if let Some(cn) = self.character_id {
            if let Some(c) = world.character(cn) {
                world.send_raw_to_char(cn, &format!("\r\n{}", c.prompt()));
            }
        }
    }

    /// Detach and persist. Runs on every exit path and is idempotent.
    pub async fn cleanup(&mut self, world: &mut World) {
        if matches!(self.state, SessionState::Disconnected) {
            return;
        }
        self.state = SessionState::Disconnected;

        let Some(character_id) = self.character_id.take() else { return };
        let Some(mut character) = world.remove_active_character(character_id) else { return };
        let name = character.name.clone();
        let room_id = character.location_id;

        world.broadcast_room(room_id, &format!("\r\n{name} slowly departs."), &[character_id]);
        if let Some(room) = world.room_mut(room_id) {
            room.characters.remove(&character_id);
        }

        // Bank the session's playtime before the save.
        if let Some(login_at) = character.login_at.take() {
            character.total_playtime_seconds += (world.now() - login_at).max(0.0) as i64;
        }

        // Drop their items from the live registry; the rows keep them.
        let mut held: Vec<crate::ItemId> = character.inventory.clone();
        held.extend(character.unique_equipped());
        for item_id in held {
            if let Some(instance) = world.items.remove(&item_id) {
                for contained in instance.contents {
                    world.items.remove(&contained);
                }
            }
        }

        if let Err(e) = world.db.save_character(&character).await {
            log::error!("Saving character {name} at logout failed: {e}");
        } else {
            log::info!("Saved character {name} at logout.");
        }
    }
}
