use super::*;
use serial_test::serial;

fn callback_data<'a>(id: &'a CStr, message: &'a CStr) -> vk::DebugUtilsMessengerCallbackDataEXT<'a> {
    vk::DebugUtilsMessengerCallbackDataEXT::default()
        .message_id_name(id)
        .message(message)
}

// ============================================================================
// Mappings
// ============================================================================

#[test]
fn test_log_severity_mapping() {
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR), LogSeverity::Error);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING), LogSeverity::Warn);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::INFO), LogSeverity::Debug);
    assert_eq!(log_severity(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE), LogSeverity::Trace);
}

#[test]
fn test_message_type_labels() {
    assert_eq!(message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION), "Validation");
    assert_eq!(message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE), "Performance");
    assert_eq!(message_type_label(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL), "General");
}

#[test]
fn test_format_message_marks_repeats() {
    assert_eq!(format_message("Validation", "VUID-1", "bad", 1), "[Validation] VUID-1: bad");
    assert_eq!(format_message("Validation", "VUID-1", "bad", 3), "[Validation] VUID-1 [x3]: bad");
}

#[test]
fn test_messenger_severity_filter() {
    let errors_only = messenger_create_info(false);
    assert!(!errors_only.message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
    assert!(errors_only.pfn_user_callback.is_some());

    let all = messenger_create_info(true);
    assert!(all.message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
}

// ============================================================================
// Callback
// ============================================================================

#[test]
#[serial]
fn test_callback_counts_by_severity() {
    reset_validation_stats();
    let data = callback_data(c"VUID-test", c"something off");

    unsafe {
        vulkan_debug_callback(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            &data,
            std::ptr::null_mut(),
        );
        vulkan_debug_callback(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            &data,
            std::ptr::null_mut(),
        );
    }

    let stats = validation_stats();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.warnings, 1);
    assert_eq!(stats.total(), 2);
}

#[test]
#[serial]
fn test_callback_tracks_repeats_until_reset() {
    reset_validation_stats();
    assert_eq!(track_message("VUID-repeat"), 1);
    assert_eq!(track_message("VUID-repeat"), 2);

    reset_validation_stats();
    assert_eq!(track_message("VUID-repeat"), 1);
    assert_eq!(validation_stats(), ValidationStats::default());
}

#[test]
#[serial]
fn test_callback_ignores_null_data() {
    reset_validation_stats();
    let result = unsafe {
        vulkan_debug_callback(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
            std::ptr::null(),
            std::ptr::null_mut(),
        )
    };
    assert_eq!(result, vk::FALSE);
    assert_eq!(validation_stats().total(), 0);
}
