//! Who may run what.
//!
//! The gate is a pure predicate over the configured owner list, the configured admin/mod roles
//! and whatever a [`MemberLookup`] reports for the invoking user.

use crate::config::Config;
use serenity::all::{Cache, GuildId, Permissions, RoleId, UserId};
use std::collections::HashSet;

/// Coarse permission levels, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    User,
    Mod,
    Admin,
    Owner,
}

/// What a command declares it needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    /// Minimum level.
    Level(Level),
    /// Any one of these permission flags.
    AnyOf(Permissions),
}

impl Requirement {
    /// Whether this requirement lets everybody through.
    pub fn is_open(&self) -> bool {
        match self {
            Requirement::Anyone | Requirement::Level(Level::User) => true,
            Requirement::Level(_) => false,
            Requirement::AnyOf(flags) => flags.is_empty(),
        }
    }
}

/// A member's effective permissions in one guild.
#[derive(Clone, Debug)]
pub struct MemberAccess {
    pub permissions: Permissions,
    pub roles: Vec<RoleId>,
}

/// Source of guild membership, usually the gateway cache.
pub trait MemberLookup: Send + Sync {
    /// `None` if the user is not a known member of the guild.
    fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<MemberAccess>;
}

impl MemberLookup for Cache {
    fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<MemberAccess> {
        let guild = self.guild(guild_id)?;
        let member = guild.members.get(&user_id)?;

        // The @everyone role shares the guild's id.
        let everyone = RoleId::new(guild_id.get());
        let mut permissions = guild
            .roles
            .get(&everyone)
            .map(|role| role.permissions)
            .unwrap_or_else(Permissions::empty);
        for role_id in &member.roles {
            if let Some(role) = guild.roles.get(role_id) {
                permissions |= role.permissions;
            }
        }
        if guild.owner_id == user_id {
            permissions = Permissions::all();
        }

        Some(MemberAccess {
            permissions,
            roles: member.roles.clone(),
        })
    }
}

pub struct PermissionGate {
    owners: HashSet<UserId>,
    admin_roles: HashSet<RoleId>,
    mod_roles: HashSet<RoleId>,
}

impl PermissionGate {
    pub fn new(cfg: &Config) -> Self {
        Self {
            owners: cfg.general.owners.iter().copied().collect(),
            admin_roles: cfg.roles.admin_roles.iter().copied().collect(),
            mod_roles: cfg.roles.mod_roles.iter().copied().collect(),
        }
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owners.contains(&user_id)
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn level_of(&self, access: &MemberAccess) -> Level {
        let has_role = |roles: &HashSet<RoleId>| access.roles.iter().any(|r| roles.contains(r));

        if access.permissions.contains(Permissions::ADMINISTRATOR) || has_role(&self.admin_roles)
        {
            Level::Admin
        } else if access
            .permissions
            .intersects(Permissions::MANAGE_MESSAGES | Permissions::MODERATE_MEMBERS)
            || has_role(&self.mod_roles)
        {
            Level::Mod
        } else {
            Level::User
        }
    }

    pub fn allows(
        &self,
        user_id: UserId,
        guild_id: Option<GuildId>,
        requirement: &Requirement,
        members: &dyn MemberLookup,
    ) -> bool {
        if requirement.is_open() || self.is_owner(user_id) {
            return true;
        }

        // Roles only exist inside a guild.
        let Some(guild_id) = guild_id else {
            return false;
        };
        let Some(access) = members.member(guild_id, user_id) else {
            return false;
        };

        match requirement {
            Requirement::Anyone => true,
            Requirement::Level(Level::Owner) => false,
            Requirement::Level(level) => self.level_of(&access) >= *level,
            Requirement::AnyOf(flags) => {
                access.permissions.contains(Permissions::ADMINISTRATOR)
                    || access.permissions.intersects(*flags)
            }
        }
    }
}
