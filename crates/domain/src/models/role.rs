//! Club role model and hierarchy.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role a user holds inside a club.
///
/// Roles are ordered; a higher rank implies every permission of the ranks below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClubRole {
    Admin,
    HeadCoach,
    AssistantCoach,
    Parent,
}

impl ClubRole {
    /// All roles, highest rank first.
    pub const ALL: [ClubRole; 4] = [
        ClubRole::Admin,
        ClubRole::HeadCoach,
        ClubRole::AssistantCoach,
        ClubRole::Parent,
    ];

    /// Numeric rank used for hierarchy comparisons.
    pub fn rank(&self) -> u8 {
        match self {
            ClubRole::Admin => 4,
            ClubRole::HeadCoach => 3,
            ClubRole::AssistantCoach => 2,
            ClubRole::Parent => 1,
        }
    }

    /// Returns true if this role is at least as privileged as `required`.
    pub fn has_at_least(&self, required: ClubRole) -> bool {
        self.rank() >= required.rank()
    }

    /// Roles allowed to issue, cancel and fully inspect invitations.
    pub fn can_manage_invitations(&self) -> bool {
        self.has_at_least(ClubRole::HeadCoach)
    }

    /// Whether this role may issue an invitation granting `role`.
    ///
    /// Invitations never grant more than the issuer holds, so only admins invite admins.
    pub fn can_invite(&self, role: ClubRole) -> bool {
        self.can_manage_invitations() && self.has_at_least(role)
    }

    /// Highest role in the given set, if any.
    pub fn highest<I>(roles: I) -> Option<ClubRole>
    where
        I: IntoIterator<Item = ClubRole>,
    {
        roles.into_iter().max_by_key(|r| r.rank())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClubRole::Admin => "admin",
            ClubRole::HeadCoach => "head_coach",
            ClubRole::AssistantCoach => "assistant_coach",
            ClubRole::Parent => "parent",
        }
    }
}

impl FromStr for ClubRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ClubRole::Admin),
            "head_coach" => Ok(ClubRole::HeadCoach),
            "assistant_coach" => Ok(ClubRole::AssistantCoach),
            "parent" => Ok(ClubRole::Parent),
            _ => Err(format!("Unknown club role: {}", s)),
        }
    }
}

impl std::fmt::Display for ClubRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy() {
        assert!(ClubRole::Admin.has_at_least(ClubRole::HeadCoach));
        assert!(ClubRole::HeadCoach.has_at_least(ClubRole::HeadCoach));
        assert!(!ClubRole::AssistantCoach.has_at_least(ClubRole::HeadCoach));
        assert!(!ClubRole::Parent.has_at_least(ClubRole::AssistantCoach));
    }

    #[test]
    fn test_can_manage_invitations() {
        assert!(ClubRole::Admin.can_manage_invitations());
        assert!(ClubRole::HeadCoach.can_manage_invitations());
        assert!(!ClubRole::AssistantCoach.can_manage_invitations());
        assert!(!ClubRole::Parent.can_manage_invitations());
    }

    #[test]
    fn test_can_invite_caps_at_own_rank() {
        assert!(ClubRole::Admin.can_invite(ClubRole::Admin));
        assert!(ClubRole::HeadCoach.can_invite(ClubRole::HeadCoach));
        assert!(ClubRole::HeadCoach.can_invite(ClubRole::Parent));
        assert!(!ClubRole::HeadCoach.can_invite(ClubRole::Admin));
        assert!(!ClubRole::AssistantCoach.can_invite(ClubRole::Parent));
    }

    #[test]
    fn test_highest() {
        assert_eq!(
            ClubRole::highest([ClubRole::Parent, ClubRole::HeadCoach, ClubRole::AssistantCoach]),
            Some(ClubRole::HeadCoach)
        );
        assert_eq!(ClubRole::highest(Vec::new()), None);
    }

    #[test]
    fn test_round_trip_names() {
        for role in ClubRole::ALL {
            assert_eq!(role.to_string().parse::<ClubRole>().unwrap(), role);
        }
        assert!("coach".parse::<ClubRole>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&ClubRole::AssistantCoach).unwrap(),
            "\"assistant_coach\""
        );
        let role: ClubRole = serde_json::from_str("\"head_coach\"").unwrap();
        assert_eq!(role, ClubRole::HeadCoach);
    }
}
