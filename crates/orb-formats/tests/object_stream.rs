#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for loading a root object graph through the registry

use orb_formats::{
    Archive, ClassRegistry, Loadable, ObjectRef, OrbBuilder, OrbError, OrbFile, OrbResult,
    borrow_as, borrow_mut_as,
};
use std::io::Cursor;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Page {
    name: String,
    actors: u32,
}

impl Loadable for Page {
    fn load(&mut self, archive: &mut Archive<'_>) -> OrbResult<()> {
        self.name = archive.read_string()?;
        self.actors = archive.read_count()?;
        Ok(())
    }
}

#[derive(Default)]
struct Game {
    title: String,
    pages: Vec<Option<ObjectRef>>,
    start: Option<ObjectRef>,
}

impl Loadable for Game {
    fn load(&mut self, archive: &mut Archive<'_>) -> OrbResult<()> {
        self.title = archive.read_string()?;
        self.pages = archive.read_object_array()?;
        self.start = archive.read_object()?;
        Ok(())
    }
}

fn string(out: &mut Vec<u8>, text: &str) {
    out.push(text.len() as u8);
    out.extend_from_slice(text.as_bytes());
}

/// Root fields followed by the page graph
///
/// Slots: 0 null, 1 root, 2 `Page` class, 3 first page, 4 second page.
fn game_stream(start_tag: u16) -> Vec<u8> {
    let mut out = Vec::new();
    string(&mut out, "Perfume");

    // Three array entries
    out.extend_from_slice(&3u16.to_le_bytes());

    out.extend_from_slice(&0xFFFFu16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(b"Page");
    string(&mut out, "Lobby");
    out.extend_from_slice(&2u16.to_le_bytes());

    out.extend_from_slice(&0x0000u16.to_le_bytes());

    out.extend_from_slice(&0x8002u16.to_le_bytes());
    string(&mut out, "Roof");
    // Large count escape
    out.extend_from_slice(&0xFFFFu16.to_le_bytes());
    out.extend_from_slice(&70_000u32.to_le_bytes());

    out.extend_from_slice(&start_tag.to_le_bytes());
    out
}

fn open(stream: Vec<u8>, registry: ClassRegistry) -> OrbFile<Cursor<Vec<u8>>> {
    let mut builder = OrbBuilder::new(0x1997);
    builder.add_object("PinkGame", stream).unwrap();
    let built = builder.build().unwrap();
    OrbFile::from_reader(Cursor::new(built.orb))
        .unwrap()
        .with_registry(registry)
}

fn registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry.register::<Page>("Page");
    registry
}

#[test]
fn game_graph_loads_with_shared_references() {
    let mut orb = open(game_stream(3), registry());
    let mut game = Game::default();
    orb.load_game(&mut game).unwrap();

    assert_eq!(game.title, "Perfume");
    assert_eq!(game.pages.len(), 3);
    assert!(game.pages[1].is_none());

    let lobby = game.pages[0].as_ref().unwrap();
    let roof = game.pages[2].as_ref().unwrap();
    {
        let lobby = borrow_as::<Page>(lobby).unwrap();
        assert_eq!(lobby.name, "Lobby");
        assert_eq!(lobby.actors, 2);
        let roof = borrow_as::<Page>(roof).unwrap();
        assert_eq!(roof.name, "Roof");
        assert_eq!(roof.actors, 70_000);
    }

    // Back-reference resolves to the already-loaded page
    let start = game.start.as_ref().unwrap();
    assert!(Rc::ptr_eq(start, lobby));
    borrow_mut_as::<Page>(start).unwrap().actors = 5;
    assert_eq!(borrow_as::<Page>(lobby).unwrap().actors, 5);
}

#[test]
fn reference_to_root_is_rejected() {
    let mut orb = open(game_stream(1), registry());
    let mut game = Game::default();
    let err = orb.load_game(&mut game).unwrap_err();
    assert!(matches!(err, OrbError::RootReference));
}

#[test]
fn reference_past_map_is_rejected() {
    let mut orb = open(game_stream(9), registry());
    let mut game = Game::default();
    let err = orb.load_game(&mut game).unwrap_err();
    assert!(matches!(
        err,
        OrbError::InvalidObjectReference { tag: 9, mapped: 5 }
    ));
}

#[test]
fn unregistered_class_is_rejected() {
    let mut orb = open(game_stream(3), ClassRegistry::new());
    let mut game = Game::default();
    let err = orb.load_game(&mut game).unwrap_err();
    assert!(matches!(err, OrbError::UnknownClass(name) if name == "Page"));
}

#[test]
fn truncated_class_header_reports_eof() {
    // New class tag announcing a 4-byte name with only two bytes present
    let mut data = Vec::new();
    data.extend_from_slice(&0xFFFFu16.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&4u16.to_le_bytes());
    data.extend_from_slice(b"Pa");

    let registry = registry();
    let mut reader = Cursor::new(data);
    let mut archive = Archive::new(&mut reader, &registry);
    let err = archive.read_object().err().unwrap();
    assert!(err.is_truncated());
    assert_eq!(archive.mapped_count(), 1);
}

#[derive(Default)]
struct Room {
    title: String,
    actors: Vec<Option<ObjectRef>>,
}

impl Loadable for Room {
    fn load(&mut self, archive: &mut Archive<'_>) -> OrbResult<()> {
        self.title = archive.read_string()?;
        self.actors = archive.read_object_array()?;
        Ok(())
    }
}

#[derive(Default)]
struct Actor {
    room: Option<ObjectRef>,
    name: String,
}

impl Loadable for Actor {
    fn load(&mut self, archive: &mut Archive<'_>) -> OrbResult<()> {
        self.room = Some(archive.read_object_as::<Room>()?);
        self.name = archive.read_string()?;
        Ok(())
    }
}

/// Room holding one actor whose first field points back at the room
///
/// Slots: 0 null, 1 `Room` class, 2 room, 3 `Actor` class, 4 actor.
fn room_stream(owner_tag: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xFFFFu16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(b"Room");
    string(&mut out, "Lobby");
    out.extend_from_slice(&1u16.to_le_bytes());

    out.extend_from_slice(&0xFFFFu16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&5u16.to_le_bytes());
    out.extend_from_slice(b"Actor");
    out.extend_from_slice(&owner_tag.to_le_bytes());
    string(&mut out, "Porter");
    out
}

fn room_registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    registry.register::<Room>("Room").register::<Actor>("Actor");
    registry
}

#[test]
fn child_may_reference_parent_while_it_loads() {
    let registry = room_registry();
    let mut reader = Cursor::new(room_stream(2));
    let mut archive = Archive::new(&mut reader, &registry);
    let room = archive.read_object_as::<Room>().unwrap();

    let loaded = borrow_as::<Room>(&room).unwrap();
    assert_eq!(loaded.title, "Lobby");
    assert_eq!(loaded.actors.len(), 1);

    let actor = loaded.actors[0].as_ref().unwrap();
    let actor = borrow_as::<Actor>(actor).unwrap();
    assert_eq!(actor.name, "Porter");
    assert!(Rc::ptr_eq(actor.room.as_ref().unwrap(), &room));
}

#[test]
fn parent_reference_of_wrong_type_is_rejected() {
    let registry = room_registry();
    // Slot 4 is the actor itself, not a room
    let mut reader = Cursor::new(room_stream(4));
    let mut archive = Archive::new(&mut reader, &registry);
    let err = archive.read_object().err().unwrap();
    assert!(matches!(err, OrbError::UnexpectedType(_)));
}

#[test]
fn object_under_load_cannot_be_borrowed() {
    let room: ObjectRef = Rc::new(std::cell::RefCell::new(Room::default()));
    let guard = room.borrow_mut();
    assert!(borrow_as::<Room>(&room).is_none());
    assert!(borrow_mut_as::<Room>(&room).is_none());
    drop(guard);
    assert!(borrow_as::<Room>(&room).is_some());
}
