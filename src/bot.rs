//! Gateway wiring: turns serenity events into triggers and replies.

use std::sync::{Arc, OnceLock};

use serde::Serialize;
use serde_json::{Value, json};
use serenity::{
    all::{
        Context, CreateMessage, EventHandler, GuildId, Http, Interaction, Member, Message,
        Permissions, Reaction, Ready, User,
    },
    async_trait,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::Configuration,
    constant::{commands, event},
    router::{DispatchOutcome, Rejection, Router},
    sync::{Readiness, SerenityApi, Synchronizer},
    trigger::{Reply, Trigger},
    util::{self, RespondableInteraction as _},
};

pub struct Bot {
    config: Configuration,
    router: Arc<Router>,
    readiness: Readiness,
    sync: OnceLock<Synchronizer>,
}

impl Bot {
    pub fn new(config: Configuration, router: Arc<Router>) -> Self {
        Self {
            config,
            router,
            readiness: Readiness::new(),
            sync: OnceLock::new(),
        }
    }

    fn synchronizer(&self, http: &Arc<Http>) -> &Synchronizer {
        self.sync.get_or_init(|| {
            Synchronizer::new(
                Arc::new(SerenityApi::new(http.clone())),
                self.readiness.clone(),
                self.config.discord.application_permissions,
                self.config.discord.permission_guilds(),
                self.config.discord.admins(),
            )
        })
    }

    async fn sync_commands(&self, http: &Arc<Http>) -> anyhow::Result<usize> {
        let remote = self
            .synchronizer(http)
            .register_all(self.router.commands(), None)
            .await?;
        Ok(remote.map_or(0, |r| r.len()))
    }

    async fn dispatch_event(&self, name: &'static str, payload: Value) {
        let trigger = Trigger::event(name, payload);
        match self.router.dispatch(&trigger).await {
            DispatchOutcome::Completed(Some(_)) => {
                debug!(event = name, "event listener reply discarded")
            }
            outcome => debug!(event = name, ?outcome, "dispatched event"),
        }
    }

    async fn interaction_create_impl(
        &self,
        http: &Http,
        interaction: &dyn util::RespondableInteraction,
    ) -> anyhow::Result<()> {
        let trigger = interaction.trigger();
        match self.router.dispatch(&trigger).await {
            DispatchOutcome::Unmatched => {
                debug!(key = trigger.kind.key(), "no handler for interaction")
            }
            DispatchOutcome::Rejected(rejection) => {
                let text = rejection.render("/", trigger.kind.key());
                interaction.reply(http, &Reply::ephemeral(text)).await?;
            }
            DispatchOutcome::Completed(Some(reply)) => interaction.reply(http, &reply).await?,
            DispatchOutcome::Completed(None) => interaction.acknowledge(http).await?,
            DispatchOutcome::Failed => {
                interaction
                    .reply(
                        http,
                        &Reply::ephemeral("Something went wrong while handling this."),
                    )
                    .await?
            }
        }
        Ok(())
    }

    async fn prefixed_message(&self, ctx: &Context, msg: &Message) -> anyhow::Result<()> {
        let prefix = &self.config.discord.prefix;
        let Some((name, args)) = util::parse_prefixed(&msg.content, prefix) else {
            return Ok(());
        };

        if name.eq_ignore_ascii_case(commands::RELOAD) {
            return self.reload(ctx, msg, &args).await;
        }

        let (user_permissions, client_permissions) = message_permissions(ctx, msg);
        let trigger = Trigger::message(name, args)
            .by(msg.author.id, user_permissions)
            .in_guild(msg.guild_id)
            .in_channel(msg.channel_id)
            .with_client_permissions(client_permissions)
            .with_payload(to_payload(msg));

        let text = match self.router.dispatch(&trigger).await {
            DispatchOutcome::Completed(Some(reply)) => reply.content,
            DispatchOutcome::Rejected(rejection) => rejection.render(prefix, name),
            DispatchOutcome::Failed => "Something went wrong while handling this.".to_string(),
            DispatchOutcome::Unmatched | DispatchOutcome::Completed(None) => return Ok(()),
        };
        msg.channel_id
            .send_message(&ctx.http, CreateMessage::new().content(text).reference_message(msg))
            .await?;
        Ok(())
    }

    /// `reload` re-reads every handler directory; `reload <name>` one command.
    async fn reload(&self, ctx: &Context, msg: &Message, args: &[String]) -> anyhow::Result<()> {
        let text = if !self.router.is_admin(msg.author.id) {
            Rejection::AdminOnly.render(&self.config.discord.prefix, commands::RELOAD)
        } else {
            let reloaded = match args.first() {
                Some(name) => self.router.reload_command(name).map(|found| {
                    if found {
                        format!("Reloaded `{name}`.")
                    } else {
                        format!("No command named `{name}` is loaded.")
                    }
                }),
                None => self
                    .router
                    .load_all(&self.config.handlers)
                    .map(|()| "Reloaded all handlers.".to_string()),
            };
            match reloaded {
                Ok(text) => {
                    info!(user = %msg.author.id, ?args, "reloaded handlers");
                    match self.sync_commands(&ctx.http).await {
                        Ok(count) => format!("{text} {count} command(s) registered."),
                        Err(err) => {
                            warn!(error = %err, "command sync after reload failed");
                            format!("{text} Registering commands failed: {err}")
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "reload failed");
                    format!("Reload failed: {err}")
                }
            }
        };

        msg.channel_id
            .send_message(&ctx.http, CreateMessage::new().content(text).reference_message(msg))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "connected; registering commands");
        self.readiness.mark_ready();
        match self.sync_commands(&ctx.http).await {
            Ok(count) => info!(count, "commands registered"),
            Err(err) => error!(error = %err, "failed to register commands"),
        }
        self.dispatch_event(event::READY, to_payload(&ready)).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(respondable) = util::interaction_to_respondable_interaction(&interaction) else {
            return;
        };

        if let Err(err) = self.interaction_create_impl(&ctx.http, respondable).await {
            warn!(error = %err, "failed to respond to interaction");
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        // Ignore messages from bots
        if msg.author.bot {
            return;
        }

        self.dispatch_event(event::MESSAGE_CREATE, to_payload(&msg))
            .await;
        if let Err(err) = self.prefixed_message(&ctx, &msg).await {
            warn!(error = %err, "failed to handle message command");
        }
    }

    async fn guild_member_addition(&self, _ctx: Context, new_member: Member) {
        self.dispatch_event(event::GUILD_MEMBER_ADD, to_payload(&new_member))
            .await;
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        user: User,
        member_data_if_available: Option<Member>,
    ) {
        let payload = json!({
            "guild_id": guild_id.get().to_string(),
            "user": to_payload(&user),
            "member": member_data_if_available.as_ref().map(to_payload),
        });
        self.dispatch_event(event::GUILD_MEMBER_REMOVE, payload)
            .await;
    }

    async fn reaction_add(&self, _ctx: Context, add_reaction: Reaction) {
        self.dispatch_event(event::REACTION_ADD, to_payload(&add_reaction))
            .await;
    }

    async fn reaction_remove(&self, _ctx: Context, removed_reaction: Reaction) {
        self.dispatch_event(event::REACTION_REMOVE, to_payload(&removed_reaction))
            .await;
    }
}

fn to_payload<T: Serialize>(model: &T) -> Value {
    serde_json::to_value(model).unwrap_or_else(|err| {
        warn!(error = %err, "failed to serialize event payload");
        Value::Null
    })
}

/// The author's and the bot's permissions in the message's channel, from the cache.
fn message_permissions(ctx: &Context, msg: &Message) -> (Option<Permissions>, Option<Permissions>) {
    let Some(guild) = msg.guild(&ctx.cache) else {
        return (None, None);
    };
    let Some(channel) = guild.channels.get(&msg.channel_id) else {
        return (None, None);
    };
    let in_channel = |user| {
        guild
            .members
            .get(&user)
            .map(|member| guild.user_permissions_in(channel, member))
    };
    let current_user = ctx.cache.current_user().id;
    (in_channel(msg.author.id), in_channel(current_user))
}
