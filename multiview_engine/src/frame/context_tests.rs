use super::*;

// ============================================================================
// FrameMask
// ============================================================================

#[test]
fn test_empty_mask_contains_nothing() {
    let mask = FrameMask::EMPTY;
    assert!(!mask.contains(0));
    assert_eq!(mask.count(), 0);
    assert!(!mask.is_complete(1));
}

#[test]
fn test_mask_completes_after_every_slot() {
    let mask = FrameMask::EMPTY.with(1);
    assert!(mask.contains(1));
    assert!(!mask.is_complete(2));

    let mask = mask.with(0);
    assert!(mask.is_complete(2));
    assert_eq!(mask.bits(), 0b11);
}

#[test]
fn test_all_mask() {
    assert_eq!(FrameMask::all(1).bits(), 0b1);
    assert_eq!(FrameMask::all(3).bits(), 0b111);
    assert_eq!(FrameMask::all(32).bits(), u32::MAX);
    assert!(FrameMask::all(3).is_complete(3));
}

#[test]
fn test_contains_out_of_range_is_false() {
    assert!(!FrameMask::all(32).contains(40));
}

// ============================================================================
// FrameContext
// ============================================================================

#[test]
fn test_frame_context_fields() {
    let ctx = FrameContext::new(1, 41, 2);
    assert_eq!(ctx.index, 1);
    assert_eq!(ctx.number, 41);
    assert_eq!(ctx.frames_in_flight, 2);
}
