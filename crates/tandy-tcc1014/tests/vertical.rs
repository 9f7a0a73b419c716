mod common;

use common::{Rig, line_tick};
use tandy_tcc1014::{GimeConfig, INT_VBORD, VerticalState};

#[test]
fn pal_coco_active_area_starts_at_scanline_63() {
    let mut rig = Rig::new(GimeConfig::default());
    rig.write(0xff90, 0x80);
    rig.write(0xff98, 0x08);
    rig.write(0xff9c, 0x03);
    rig.write(0xff9d, 0x80);
    // SAM F0.
    rig.write(0xffc7, 0);

    for line in 0..3 {
        rig.run_to_line(line, 200);
        assert_eq!(rig.gime.vertical_state(), VerticalState::SyncPulse, "line {line}");
    }
    for line in 3..16 {
        rig.run_to_line(line, 200);
        assert_eq!(rig.gime.vertical_state(), VerticalState::SyncBlank, "line {line}");
    }
    for line in 16..79 {
        rig.run_to_line(line, 200);
        assert_eq!(rig.gime.vertical_state(), VerticalState::TopBorder, "line {line}");
        assert_eq!(u64::from(rig.gime.scanline()), line - 16);
    }

    rig.run_to_line(79, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::ActiveArea);
    assert_eq!(rig.gime.scanline(), 63);
    assert_eq!(rig.gime.row(), 3);
    assert_eq!(rig.gime.line_base(), 0x40200);

    rig.run_to_line(80, 200);
    assert_eq!(rig.gime.row(), 4);
}

#[test]
fn pal_field_is_312_lines() {
    let mut rig = Rig::new(GimeConfig::default());
    rig.write(0xff90, 0x80 | 0x20);
    rig.write(0xff98, 0x08);
    rig.write(0xff92, INT_VBORD);

    rig.run_to_line(270, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::ActiveArea);
    assert!(!rig.host.irq);
    rig.run_to_line(271, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::BottomBorder);
    assert!(rig.host.irq);
    assert_eq!(rig.host.fsync_edges, vec![true, false]);

    rig.run_to_line(311, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::BottomBorder);
    assert_eq!(rig.gime.field_count(), 0);
    rig.run_to_line(312, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::SyncPulse);
    assert_eq!(rig.gime.field_count(), 1);
}

#[test]
fn ntsc_field_is_262_lines() {
    let mut rig = Rig::new(GimeConfig::default());
    rig.write(0xff90, 0x80);
    rig.run_to_line(41, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::ActiveArea);
    assert_eq!(rig.gime.scanline(), 25);
    rig.run_to_line(233, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::BottomBorder);
    rig.run_to_line(261, 200);
    assert_eq!(rig.gime.field_count(), 0);
    rig.run_to_line(262, 200);
    assert_eq!(rig.gime.field_count(), 1);
    // Second field lines up with the first.
    rig.run_to_line(262 + 41, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::ActiveArea);
}

#[test]
fn lines_per_field_changes_active_height() {
    let mut rig = Rig::new(GimeConfig::default());
    // Native, LPF=3: 225 lines with an 8-line top border.
    rig.write(0xff99, 0x60);
    rig.run_to_line(24, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::ActiveArea);
    rig.run_to_line(24 + 224, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::ActiveArea);
    rig.run_to_line(24 + 225, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::BottomBorder);
}

#[test]
fn frame_heights_latch_at_the_top_border() {
    let mut rig = Rig::new(GimeConfig::default());
    rig.run_to_line(20, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::TopBorder);
    // Too late for this field.
    rig.write(0xff99, 0x60);
    rig.run_to_line(24, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::TopBorder);
    rig.run_to_line(41, 200);
    assert_eq!(rig.gime.vertical_state(), VerticalState::ActiveArea);
}

#[test]
fn lpr7_holds_the_row_address() {
    let mut frozen = Rig::new(GimeConfig::default());
    frozen.write(0xff98, 0x07);
    let mut counting = Rig::new(GimeConfig::default());
    counting.write(0xff98, 0x00);

    let line = 41 + 10;
    frozen.run_to_line(line, 200);
    counting.run_to_line(line, 200);
    assert_eq!(frozen.gime.vertical_state(), VerticalState::ActiveArea);
    assert_eq!(frozen.gime.line_base(), 0);
    assert_eq!(frozen.gime.row(), 0);
    // 32 columns, one line per row.
    assert_eq!(counting.gime.line_base(), 10 * 32);
}

#[test]
fn hven_rows_are_256_bytes() {
    let mut rig = Rig::new(GimeConfig::default());
    rig.write(0xff98, 0x80);
    rig.write(0xff9f, 0x80);
    rig.write(0xff9e, 0x02);
    rig.run_to_line(41 + 3, 200);
    assert_eq!(rig.gime.line_base(), 0x10 + 3 * 256);
}

#[test]
fn hsync_is_a_64_tick_pulse() {
    let mut rig = Rig::new(GimeConfig::default());
    rig.run_to(line_tick(5));
    assert!(rig.queue.is_queued(tandy_tcc1014::GimeEvent::HsRise));
    assert_eq!(
        rig.queue.scheduled(tandy_tcc1014::GimeEvent::HsRise),
        Some(emu_core::Ticks(line_tick(5) + 64))
    );
    assert_eq!(
        rig.queue.scheduled(tandy_tcc1014::GimeEvent::HsFall),
        Some(emu_core::Ticks(line_tick(6)))
    );
}

#[test]
fn one_long_run_matches_stepping_line_by_line() {
    let mut stepped = Rig::new(GimeConfig::default());
    stepped.write(0xff90, 0x80);
    let mut jumped = stepped.clone();

    for line in 0..=45 {
        stepped.run_to_line(line, 200);
    }
    jumped.run_to_line(45, 200);

    assert_eq!(jumped.gime.vertical_state(), VerticalState::ActiveArea);
    assert_eq!(jumped.gime.scanline(), 29);
    assert_eq!(jumped.gime.vertical_state(), stepped.gime.vertical_state());
    assert_eq!(jumped.gime.scanline(), stepped.gime.scanline());
    assert_eq!(jumped.gime.line_base(), stepped.gime.line_base());
    assert_eq!(jumped.host.lines, stepped.host.lines);
    assert!(jumped.queue.next_tick().is_some_and(|t| t.get() > line_tick(45) + 200));
}
