//! A scripted turn of play: the read opcode refreshes the status line,
//! tokenizes input against the dictionary, and the game prints an object
//! name back.

use lantern::interpreter::Interpreter;
use lantern::test_util::{ScriptedIo, TestStory};
use lantern::zio::StatusKind;

#[test]
fn one_turn_of_play() {
    let mut story = TestStory::new();
    story.set_dictionary(&[], &["look", "take"]);

    // Object 1 is the current location, named "den".
    story.set_object(1, 0, 0, 0);
    let name_table = story.append(&[0x01, 0xA5, 0x53, 0x00]); // "den"
    story.set_prop_table(1, name_table as u16);

    let text_buf = story.append(&[20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    let parse = story.append(&[4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

    // g16 (the status location) holds object 1.
    story.poke(lantern::test_util::GLOBAL_TABLE, &[0x00, 0x01]);

    story.set_code(&[
        0xE4,
        0x0F, // sread with two large operands
        (text_buf >> 8) as u8,
        text_buf as u8,
        (parse >> 8) as u8,
        parse as u8,
        0xAA,
        0x10, // print_obj [g16]
        0xBA, // quit
    ]);

    let io = ScriptedIo::new();
    let handle = io.handle();
    handle.push_input("look AROUND");

    let mut interpreter = Interpreter::new(story.build_vm(), Box::new(io));
    interpreter.run().unwrap();

    // The status line was refreshed before input was taken.
    assert_eq!(
        handle.statuses(),
        vec![("den".to_string(), 0, 0, StatusKind::Score)]
    );
    // The game answered with the location name.
    assert_eq!(handle.output(), "den");

    // The parse table holds both words, only the first in the dictionary.
    let vm = &interpreter.vm;
    assert_eq!(vm.memory.read_byte(parse + 1).unwrap(), 2);
    assert_ne!(vm.memory.read_word(parse + 2).unwrap(), 0);
    assert_eq!(vm.memory.read_byte(parse + 4).unwrap(), 4); // "look"
    assert_eq!(vm.memory.read_byte(parse + 5).unwrap(), 1);
    assert_eq!(vm.memory.read_word(parse + 6).unwrap(), 0); // "around"
    assert_eq!(vm.memory.read_byte(parse + 9).unwrap(), 6);

    // The text buffer holds the lowercased line.
    assert_eq!(vm.memory.read_byte(text_buf + 1).unwrap(), b'l');
    assert_eq!(vm.memory.read_byte(text_buf + 6).unwrap(), b'a');
    assert_eq!(vm.memory.read_byte(text_buf + 12).unwrap(), 0);
}
