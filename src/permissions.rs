//! Permission names and the role/user allow-list resolver.

use serenity::all::{Permissions, RoleId, UserId};

/// Permission bits scripts may name, keyed by their Discord name.
const NAMED: &[(&str, Permissions)] = &[
    ("CREATE_INSTANT_INVITE", Permissions::CREATE_INSTANT_INVITE),
    ("KICK_MEMBERS", Permissions::KICK_MEMBERS),
    ("BAN_MEMBERS", Permissions::BAN_MEMBERS),
    ("ADMINISTRATOR", Permissions::ADMINISTRATOR),
    ("MANAGE_CHANNELS", Permissions::MANAGE_CHANNELS),
    ("MANAGE_GUILD", Permissions::MANAGE_GUILD),
    ("ADD_REACTIONS", Permissions::ADD_REACTIONS),
    ("VIEW_AUDIT_LOG", Permissions::VIEW_AUDIT_LOG),
    ("PRIORITY_SPEAKER", Permissions::PRIORITY_SPEAKER),
    ("STREAM", Permissions::STREAM),
    ("VIEW_CHANNEL", Permissions::VIEW_CHANNEL),
    ("SEND_MESSAGES", Permissions::SEND_MESSAGES),
    ("SEND_TTS_MESSAGES", Permissions::SEND_TTS_MESSAGES),
    ("MANAGE_MESSAGES", Permissions::MANAGE_MESSAGES),
    ("EMBED_LINKS", Permissions::EMBED_LINKS),
    ("ATTACH_FILES", Permissions::ATTACH_FILES),
    ("READ_MESSAGE_HISTORY", Permissions::READ_MESSAGE_HISTORY),
    ("MENTION_EVERYONE", Permissions::MENTION_EVERYONE),
    ("USE_EXTERNAL_EMOJIS", Permissions::USE_EXTERNAL_EMOJIS),
    ("CONNECT", Permissions::CONNECT),
    ("SPEAK", Permissions::SPEAK),
    ("MUTE_MEMBERS", Permissions::MUTE_MEMBERS),
    ("DEAFEN_MEMBERS", Permissions::DEAFEN_MEMBERS),
    ("MOVE_MEMBERS", Permissions::MOVE_MEMBERS),
    ("USE_VAD", Permissions::USE_VAD),
    ("CHANGE_NICKNAME", Permissions::CHANGE_NICKNAME),
    ("MANAGE_NICKNAMES", Permissions::MANAGE_NICKNAMES),
    ("MANAGE_ROLES", Permissions::MANAGE_ROLES),
    ("MANAGE_WEBHOOKS", Permissions::MANAGE_WEBHOOKS),
    ("MANAGE_EVENTS", Permissions::MANAGE_EVENTS),
    ("MANAGE_THREADS", Permissions::MANAGE_THREADS),
    ("MODERATE_MEMBERS", Permissions::MODERATE_MEMBERS),
];

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Parses a single permission name.
///
/// `SEND_MESSAGES`, `SendMessages` and `send_messages` all name the same bit.
pub fn parse_permission(name: &str) -> Option<Permissions> {
    let wanted = normalize(name);
    NAMED
        .iter()
        .find(|(known, _)| normalize(known) == wanted)
        .map(|(_, bits)| *bits)
}

/// Parses a list of names into one bit set, reporting the first unknown name.
pub fn parse_permissions<S: AsRef<str>>(names: &[S]) -> Result<Permissions, String> {
    names.iter().try_fold(Permissions::empty(), |acc, name| {
        parse_permission(name.as_ref())
            .map(|bits| acc | bits)
            .ok_or_else(|| format!("unknown permission `{}`", name.as_ref()))
    })
}

/// Discord names of every named bit in `permissions`, in declaration order.
pub fn permission_names(permissions: Permissions) -> Vec<&'static str> {
    NAMED
        .iter()
        .filter(|(_, bits)| permissions.contains(*bits))
        .map(|(name, _)| *name)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideTarget {
    Role(RoleId),
    User(UserId),
}

/// One allow/deny entry for a single remote command in a single guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionOverride {
    pub target: OverrideTarget,
    pub allow: bool,
}

impl PermissionOverride {
    pub fn allow_role(id: RoleId) -> Self {
        Self {
            target: OverrideTarget::Role(id),
            allow: true,
        }
    }

    pub fn allow_user(id: UserId) -> Self {
        Self {
            target: OverrideTarget::User(id),
            allow: true,
        }
    }
}

/// A guild role and the permissions it grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildRole {
    pub id: RoleId,
    pub permissions: Permissions,
}

/// Builds the allow-list for one command in one guild.
///
/// Every role whose permissions contain all of `required` is allowed; an
/// empty requirement adds no role entries at all. Admins are always allowed
/// regardless of roles.
pub fn resolve_overrides(
    required: Permissions,
    roles: &[GuildRole],
    admins: &[UserId],
) -> Vec<PermissionOverride> {
    let mut overrides = Vec::with_capacity(roles.len() + admins.len());
    if !required.is_empty() {
        overrides.extend(
            roles
                .iter()
                .filter(|role| role.permissions.contains(required))
                .map(|role| PermissionOverride::allow_role(role.id)),
        );
    }
    overrides.extend(admins.iter().copied().map(PermissionOverride::allow_user));
    overrides
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(id: u64, permissions: Permissions) -> GuildRole {
        GuildRole {
            id: RoleId::new(id),
            permissions,
        }
    }

    #[test]
    fn names_parse_in_any_casing() {
        for name in ["SEND_MESSAGES", "SendMessages", "send_messages"] {
            assert_eq!(parse_permission(name), Some(Permissions::SEND_MESSAGES));
        }
        assert_eq!(parse_permission("FLY"), None);
    }

    #[test]
    fn unknown_name_is_reported() {
        let err = parse_permissions(&["KickMembers", "Teleport"]).unwrap_err();
        assert_eq!(err, "unknown permission `Teleport`");

        let bits = parse_permissions(&["KickMembers", "BanMembers"]).unwrap();
        assert_eq!(bits, Permissions::KICK_MEMBERS | Permissions::BAN_MEMBERS);
    }

    #[test]
    fn names_of_a_set() {
        let names = permission_names(Permissions::SEND_MESSAGES | Permissions::KICK_MEMBERS);
        assert_eq!(names, vec!["KICK_MEMBERS", "SEND_MESSAGES"]);
    }

    #[test]
    fn superset_roles_and_admins_are_allowed() {
        let roles = [
            role(1, Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS),
            role(2, Permissions::EMBED_LINKS),
        ];
        let admins = [UserId::new(10), UserId::new(11)];

        let overrides = resolve_overrides(Permissions::SEND_MESSAGES, &roles, &admins);

        assert_eq!(
            overrides,
            vec![
                PermissionOverride::allow_role(RoleId::new(1)),
                PermissionOverride::allow_user(UserId::new(10)),
                PermissionOverride::allow_user(UserId::new(11)),
            ]
        );
    }

    #[test]
    fn partial_overlap_is_not_enough() {
        let roles = [role(3, Permissions::KICK_MEMBERS)];
        let required = Permissions::KICK_MEMBERS | Permissions::BAN_MEMBERS;
        assert!(resolve_overrides(required, &roles, &[]).is_empty());
    }

    #[test]
    fn empty_requirement_lists_only_admins() {
        let roles = [role(1, Permissions::all())];
        let overrides = resolve_overrides(Permissions::empty(), &roles, &[UserId::new(5)]);
        assert_eq!(overrides, vec![PermissionOverride::allow_user(UserId::new(5))]);
    }
}
