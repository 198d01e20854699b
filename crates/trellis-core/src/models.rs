//! Data models for Trellis
//!
//! Every piece of board content is a [`Block`]: boards, views, cards and
//! their sub-elements share one recursive shape told apart by
//! [`BlockType`]. The store never looks inside `fields`; only the search
//! engine reads the handful of board keys documented on [`Block`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Board payload key marking a template board
pub const FIELD_IS_TEMPLATE: &str = "isTemplate";
/// Board payload key holding the visibility (`"O"` open, `"P"` private)
pub const FIELD_BOARD_TYPE: &str = "boardType";
/// Board payload key holding the card property schema
pub const FIELD_CARD_PROPERTIES: &str = "cardProperties";

/// Type tag of a block
///
/// The set is closed for the types the workspace knows about but accepts
/// any other tag through [`BlockType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Board,
    View,
    Card,
    Text,
    Image,
    Divider,
    Checkbox,
    Comment,
    Other(String),
}

impl BlockType {
    /// The stored tag
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Board => "board",
            BlockType::View => "view",
            BlockType::Card => "card",
            BlockType::Text => "text",
            BlockType::Image => "image",
            BlockType::Divider => "divider",
            BlockType::Checkbox => "checkbox",
            BlockType::Comment => "comment",
            BlockType::Other(tag) => tag,
        }
    }
}

impl From<&str> for BlockType {
    fn from(s: &str) -> Self {
        match s {
            "board" => BlockType::Board,
            "view" => BlockType::View,
            "card" => BlockType::Card,
            "text" => BlockType::Text,
            "image" => BlockType::Image,
            "divider" => BlockType::Divider,
            "checkbox" => BlockType::Checkbox,
            "comment" => BlockType::Comment,
            other => BlockType::Other(other.to_string()),
        }
    }
}

impl From<String> for BlockType {
    fn from(s: String) -> Self {
        match BlockType::from(s.as_str()) {
            BlockType::Other(_) => BlockType::Other(s),
            known => known,
        }
    }
}

impl From<BlockType> for String {
    fn from(t: BlockType) -> Self {
        match t {
            BlockType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for BlockType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(BlockType::from(s))
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of a board to members of its team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardVisibility {
    /// Any non-guest team member may see it
    Open,
    /// Only explicit board members may see it
    Private,
}

/// A generic typed tree node
///
/// Board payload keys interpreted by search:
/// - `isTemplate`: templates never show up in search results
/// - `boardType`: `"O"` for open boards, anything else is private
/// - `cardProperties`: array of `{ "id", "name", "type" }` property templates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Unique identifier
    pub id: String,
    /// Owning block, empty for roots
    #[serde(default)]
    pub parent_id: String,
    /// Board this block belongs to; a board's root is itself
    #[serde(default)]
    pub root_id: String,
    /// Type tag
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Team (workspace) owning the board
    #[serde(default)]
    pub team_id: String,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Opaque payload
    #[serde(default = "empty_fields")]
    pub fields: Value,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub modified_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn empty_fields() -> Value {
    Value::Object(Map::new())
}

impl Block {
    /// Create a new root block with a generated ID
    pub fn new(block_type: BlockType) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), block_type)
    }

    /// Create a block with a specific ID
    pub fn with_id(id: impl Into<String>, block_type: BlockType) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            parent_id: String::new(),
            root_id: String::new(),
            block_type,
            team_id: String::new(),
            title: String::new(),
            fields: empty_fields(),
            created_by: String::new(),
            modified_by: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a board in the given team
    pub fn board(title: impl Into<String>, team_id: impl Into<String>) -> Self {
        let mut board = Self::new(BlockType::Board);
        board.title = title.into();
        board.team_id = team_id.into();
        board
    }

    /// Create a child of `parent`, inheriting its board and team
    pub fn child_of(parent: &Block, block_type: BlockType) -> Self {
        let mut block = Self::new(block_type);
        block.parent_id = parent.id.clone();
        block.root_id = if parent.root_id.is_empty() {
            parent.id.clone()
        } else {
            parent.root_id.clone()
        };
        block.team_id = parent.team_id.clone();
        block
    }

    /// Whether this block has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_empty()
    }

    /// Update the title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = Utc::now();
    }

    /// Set a single payload field
    pub fn set_field(&mut self, key: impl Into<String>, value: Value) {
        if !self.fields.is_object() {
            self.fields = empty_fields();
        }
        if let Value::Object(map) = &mut self.fields {
            map.insert(key.into(), value);
        }
        self.updated_at = Utc::now();
    }

    /// Whether the payload marks this block as a template
    pub fn is_template(&self) -> bool {
        self.fields
            .get(FIELD_IS_TEMPLATE)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Board visibility; boards default to private
    pub fn visibility(&self) -> BoardVisibility {
        match self.fields.get(FIELD_BOARD_TYPE).and_then(Value::as_str) {
            Some("O") => BoardVisibility::Open,
            _ => BoardVisibility::Private,
        }
    }

    /// Mark a board open or private
    pub fn set_visibility(&mut self, visibility: BoardVisibility) {
        let tag = match visibility {
            BoardVisibility::Open => "O",
            BoardVisibility::Private => "P",
        };
        self.set_field(FIELD_BOARD_TYPE, Value::from(tag));
    }

    /// Names of the card properties declared in the board schema
    pub fn property_names(&self) -> Vec<&str> {
        self.fields
            .get(FIELD_CARD_PROPERTIES)
            .and_then(Value::as_array)
            .map(|props| {
                props
                    .iter()
                    .filter_map(|p| p.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// An account record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Opaque password hash; never serialized out
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub is_guest: bool,
    #[serde(default = "empty_fields")]
    pub props: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the account is deactivated
    #[serde(default)]
    pub delete_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user with a generated ID
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            password: String::new(),
            is_guest: false,
            props: empty_fields(),
            created_at: now,
            updated_at: now,
            delete_at: None,
        }
    }

    /// Create a guest account
    pub fn guest(username: impl Into<String>, email: impl Into<String>) -> Self {
        let mut user = Self::new(username, email);
        user.is_guest = true;
        user
    }
}

/// Role a member holds on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardRole {
    Viewer,
    Editor,
    Admin,
}

impl FromStr for BoardRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(BoardRole::Viewer),
            "editor" => Ok(BoardRole::Editor),
            "admin" => Ok(BoardRole::Admin),
            other => Err(format!("invalid board role: {}", other)),
        }
    }
}

/// Explicit membership of a user on a board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoardMember {
    pub board_id: String,
    pub user_id: String,
    pub scheme_admin: bool,
    pub scheme_editor: bool,
    pub scheme_viewer: bool,
}

impl BoardMember {
    /// Membership with the given role; higher roles imply the lower ones
    pub fn new(board_id: impl Into<String>, user_id: impl Into<String>, role: BoardRole) -> Self {
        Self {
            board_id: board_id.into(),
            user_id: user_id.into(),
            scheme_admin: role == BoardRole::Admin,
            scheme_editor: matches!(role, BoardRole::Editor | BoardRole::Admin),
            scheme_viewer: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_type_tags() {
        assert_eq!(BlockType::from("board"), BlockType::Board);
        assert_eq!(BlockType::from("card").as_str(), "card");
        assert_eq!(
            BlockType::from("checklist"),
            BlockType::Other("checklist".to_string())
        );
        assert_eq!(BlockType::Other("checklist".into()).to_string(), "checklist");
    }

    #[test]
    fn test_block_type_serializes_as_tag() {
        let block = Block::with_id("b1", BlockType::Board);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "board");
        assert_eq!(json["parentId"], "");

        let parsed: Block = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn test_child_of_inherits_board_and_team() {
        let board = Block::board("Roadmap", "t1");
        let card = Block::child_of(&board, BlockType::Card);
        let text = Block::child_of(&card, BlockType::Text);

        assert_eq!(card.parent_id, board.id);
        assert_eq!(card.root_id, board.id);
        assert_eq!(text.root_id, board.id);
        assert_eq!(text.team_id, "t1");
        assert!(board.is_root());
        assert!(!text.is_root());
    }

    #[test]
    fn test_board_payload_keys() {
        let mut board = Block::board("Roadmap", "t1");
        assert!(!board.is_template());
        assert_eq!(board.visibility(), BoardVisibility::Private);

        board.set_field(FIELD_IS_TEMPLATE, json!(true));
        board.set_visibility(BoardVisibility::Open);
        board.set_field(
            FIELD_CARD_PROPERTIES,
            json!([{ "id": "p1", "name": "Status", "type": "select" }, { "id": "p2" }]),
        );

        assert!(board.is_template());
        assert_eq!(board.visibility(), BoardVisibility::Open);
        assert_eq!(board.property_names(), vec!["Status"]);
    }

    #[test]
    fn test_set_field_replaces_non_object_payload() {
        let mut block = Block::with_id("b1", BlockType::Card);
        block.fields = json!("not an object");
        block.set_field("icon", json!("x"));
        assert_eq!(block.fields, json!({ "icon": "x" }));
    }

    #[test]
    fn test_user_password_not_serialized() {
        let mut user = User::new("alice", "alice@example.com");
        user.password = "hash".to_string();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hash"));
        assert!(User::guest("g", "g@example.com").is_guest);
    }

    #[test]
    fn test_board_member_roles() {
        let admin = BoardMember::new("b1", "u1", BoardRole::Admin);
        assert!(admin.scheme_admin && admin.scheme_editor && admin.scheme_viewer);

        let viewer = BoardMember::new("b1", "u1", "viewer".parse().unwrap());
        assert!(!viewer.scheme_editor);
        assert!(viewer.scheme_viewer);
        assert!("owner".parse::<BoardRole>().is_err());
    }
}
