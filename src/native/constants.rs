/*!
 * Native Constants
 *
 * Essential constants of the native virtualization API: error codes and their
 * text, property identifiers and type tags, event types, and option values.
 */

use crate::core::types::PropertyId;

/// Native error code type
pub type ErrorCode = u64;

/// Timeout value meaning "wait forever"
pub const NO_TIMEOUT: i32 = -1;

// =============================================================================
// ERROR CODES
// =============================================================================

pub const VIX_OK: ErrorCode = 0;

// General errors
pub const VIX_E_FAIL: ErrorCode = 1;
pub const VIX_E_OUT_OF_MEMORY: ErrorCode = 2;
pub const VIX_E_INVALID_ARG: ErrorCode = 3;
pub const VIX_E_FILE_NOT_FOUND: ErrorCode = 4;
pub const VIX_E_OBJECT_IS_BUSY: ErrorCode = 5;
pub const VIX_E_NOT_SUPPORTED: ErrorCode = 6;
pub const VIX_E_FILE_ERROR: ErrorCode = 7;
pub const VIX_E_DISK_FULL: ErrorCode = 8;
pub const VIX_E_INCORRECT_FILE_TYPE: ErrorCode = 9;
pub const VIX_E_CANCELLED: ErrorCode = 10;
pub const VIX_E_FILE_READ_ONLY: ErrorCode = 11;
pub const VIX_E_FILE_ALREADY_EXISTS: ErrorCode = 12;
pub const VIX_E_FILE_ACCESS_ERROR: ErrorCode = 13;
pub const VIX_E_REQUIRES_LARGE_FILES: ErrorCode = 14;
pub const VIX_E_FILE_ALREADY_LOCKED: ErrorCode = 15;

// Handle errors
pub const VIX_E_INVALID_HANDLE: ErrorCode = 1000;
pub const VIX_E_NOT_SUPPORTED_ON_HANDLE_TYPE: ErrorCode = 1001;
pub const VIX_E_TOO_MANY_HANDLES: ErrorCode = 1002;

// XML errors
pub const VIX_E_NOT_FOUND: ErrorCode = 2000;
pub const VIX_E_TYPE_MISMATCH: ErrorCode = 2001;
pub const VIX_E_INVALID_XML: ErrorCode = 2002;

// VM control errors
pub const VIX_E_TIMEOUT_WAITING_FOR_TOOLS: ErrorCode = 3000;
pub const VIX_E_UNRECOGNIZED_COMMAND: ErrorCode = 3001;
pub const VIX_E_OP_NOT_SUPPORTED_ON_GUEST: ErrorCode = 3003;
pub const VIX_E_PROGRAM_NOT_STARTED: ErrorCode = 3004;
pub const VIX_E_VM_NOT_RUNNING: ErrorCode = 3006;
pub const VIX_E_VM_IS_RUNNING: ErrorCode = 3007;
pub const VIX_E_CANNOT_CONNECT_TO_VM: ErrorCode = 3008;
pub const VIX_E_POWEROP_SCRIPTS_NOT_AVAILABLE: ErrorCode = 3009;
pub const VIX_E_NO_GUEST_OS_INSTALLED: ErrorCode = 3010;
pub const VIX_E_VM_INSUFFICIENT_HOST_MEMORY: ErrorCode = 3011;
pub const VIX_E_SUSPEND_ERROR: ErrorCode = 3012;
pub const VIX_E_VM_NOT_ENOUGH_CPUS: ErrorCode = 3013;
pub const VIX_E_HOST_USER_PERMISSIONS: ErrorCode = 3014;
pub const VIX_E_GUEST_USER_PERMISSIONS: ErrorCode = 3015;
pub const VIX_E_TOOLS_NOT_RUNNING: ErrorCode = 3016;
pub const VIX_E_GUEST_OPERATIONS_PROHIBITED: ErrorCode = 3017;
pub const VIX_E_ANON_GUEST_OPERATIONS_PROHIBITED: ErrorCode = 3018;
pub const VIX_E_ROOT_GUEST_OPERATIONS_PROHIBITED: ErrorCode = 3019;
pub const VIX_E_MISSING_ANON_GUEST_ACCOUNT: ErrorCode = 3023;
pub const VIX_E_CANNOT_AUTHENTICATE_WITH_GUEST: ErrorCode = 3024;

// VM errors
pub const VIX_E_VM_NOT_FOUND: ErrorCode = 4000;
pub const VIX_E_NOT_SUPPORTED_FOR_VM_VERSION: ErrorCode = 4001;
pub const VIX_E_CANNOT_READ_VM_CONFIG: ErrorCode = 4002;
pub const VIX_E_TEMPLATE_VM: ErrorCode = 4003;
pub const VIX_E_VM_ALREADY_LOADED: ErrorCode = 4004;

// Property errors
pub const VIX_E_UNRECOGNIZED_PROPERTY: ErrorCode = 6000;
pub const VIX_E_INVALID_PROPERTY_VALUE: ErrorCode = 6001;
pub const VIX_E_READ_ONLY_PROPERTY: ErrorCode = 6002;
pub const VIX_E_MISSING_REQUIRED_PROPERTY: ErrorCode = 6003;

// Snapshot errors
pub const VIX_E_SNAPSHOT_INVAL: ErrorCode = 13000;
pub const VIX_E_SNAPSHOT_NOT_FOUND: ErrorCode = 13003;

// Host errors
pub const VIX_E_CANNOT_CONNECT_TO_HOST: ErrorCode = 18000;

/// Error codes that indicate a permissions or authentication problem
pub const SECURITY_ERROR_CODES: &[ErrorCode] = &[
    VIX_E_HOST_USER_PERMISSIONS,
    VIX_E_GUEST_USER_PERMISSIONS,
    VIX_E_GUEST_OPERATIONS_PROHIBITED,
    VIX_E_ANON_GUEST_OPERATIONS_PROHIBITED,
    VIX_E_ROOT_GUEST_OPERATIONS_PROHIBITED,
    VIX_E_MISSING_ANON_GUEST_ACCOUNT,
    VIX_E_CANNOT_AUTHENTICATE_WITH_GUEST,
];

/// Human-readable text for a native error code (US English only)
pub fn error_text(code: ErrorCode) -> &'static str {
    match code {
        VIX_OK => "The operation was successful",
        VIX_E_FAIL => "Unknown error",
        VIX_E_OUT_OF_MEMORY => "Memory allocation failed: out of memory",
        VIX_E_INVALID_ARG => "One of the parameters was invalid",
        VIX_E_FILE_NOT_FOUND => "A file was not found",
        VIX_E_OBJECT_IS_BUSY => "This function cannot be performed because the handle is executing another function",
        VIX_E_NOT_SUPPORTED => "The operation is not supported",
        VIX_E_FILE_ERROR => "A file access error occurred on the host or guest operating system",
        VIX_E_DISK_FULL => "An error occurred while writing a file; the disk is full",
        VIX_E_INCORRECT_FILE_TYPE => "An error occurred while accessing a file: wrong file type",
        VIX_E_CANCELLED => "The operation was canceled",
        VIX_E_FILE_READ_ONLY => "The file is write-protected",
        VIX_E_FILE_ALREADY_EXISTS => "The file already exists",
        VIX_E_FILE_ACCESS_ERROR => "You do not have access rights to this file",
        VIX_E_REQUIRES_LARGE_FILES => "The file system does not support large files",
        VIX_E_FILE_ALREADY_LOCKED => "The file is already in use",
        VIX_E_INVALID_HANDLE => "The handle is not a valid VIX object",
        VIX_E_NOT_SUPPORTED_ON_HANDLE_TYPE => "The operation is not supported on this type of handle",
        VIX_E_TOO_MANY_HANDLES => "Too many handles are open",
        VIX_E_NOT_FOUND => "Invalid file: a required section of the file is missing",
        VIX_E_TYPE_MISMATCH => "Invalid file: an object has the wrong type",
        VIX_E_INVALID_XML => "Invalid file: contents are corrupt",
        VIX_E_TIMEOUT_WAITING_FOR_TOOLS => "A timeout error occurred while waiting for tools in the guest",
        VIX_E_UNRECOGNIZED_COMMAND => "The command is not recognized by the virtual machine",
        VIX_E_OP_NOT_SUPPORTED_ON_GUEST => "The requested operation is not supported on this guest operating system",
        VIX_E_PROGRAM_NOT_STARTED => "A program could not run on the guest operating system",
        VIX_E_VM_NOT_RUNNING => "The virtual machine needs to be powered on",
        VIX_E_VM_IS_RUNNING => "The virtual machine should not be powered on. It is already running",
        VIX_E_CANNOT_CONNECT_TO_VM => "Cannot connect to the virtual machine",
        VIX_E_POWEROP_SCRIPTS_NOT_AVAILABLE => "Cannot execute scripts",
        VIX_E_NO_GUEST_OS_INSTALLED => "There is no operating system installed in the virtual machine",
        VIX_E_VM_INSUFFICIENT_HOST_MEMORY => "Not enough physical memory is available to power on this virtual machine",
        VIX_E_SUSPEND_ERROR => "An error occurred while suspending the virtual machine",
        VIX_E_VM_NOT_ENOUGH_CPUS => "This virtual machine is configured to run with more CPUs than the host has",
        VIX_E_HOST_USER_PERMISSIONS => "Insufficient permissions in the host operating system",
        VIX_E_GUEST_USER_PERMISSIONS => "Authentication failure or insufficient permissions in guest operating system",
        VIX_E_TOOLS_NOT_RUNNING => "Guest tools are not running in the virtual machine",
        VIX_E_GUEST_OPERATIONS_PROHIBITED => "Guest operations are not allowed on this virtual machine",
        VIX_E_ANON_GUEST_OPERATIONS_PROHIBITED => "Guest operations are not allowed for the anonymous user on this virtual machine",
        VIX_E_ROOT_GUEST_OPERATIONS_PROHIBITED => "Guest operations are not allowed for administrative user on this virtual machine",
        VIX_E_MISSING_ANON_GUEST_ACCOUNT => "The virtual machine configuration must specify the guest account name to be used for anonymous guest operations",
        VIX_E_CANNOT_AUTHENTICATE_WITH_GUEST => "The virtual machine cannot authenticate users with guest",
        VIX_E_VM_NOT_FOUND => "The virtual machine cannot be found",
        VIX_E_NOT_SUPPORTED_FOR_VM_VERSION => "The operation is not supported for this virtual machine version",
        VIX_E_CANNOT_READ_VM_CONFIG => "Cannot read the virtual machine configuration file",
        VIX_E_TEMPLATE_VM => "Cannot perform this operation on a template virtual machine",
        VIX_E_VM_ALREADY_LOADED => "The virtual machine has already been loaded",
        VIX_E_UNRECOGNIZED_PROPERTY => "Unrecognized handle property identifier",
        VIX_E_INVALID_PROPERTY_VALUE => "Invalid property value",
        VIX_E_READ_ONLY_PROPERTY => "Cannot change a read-only property",
        VIX_E_MISSING_REQUIRED_PROPERTY => "This handle is missing a required property",
        VIX_E_SNAPSHOT_INVAL => "Invalid snapshot configuration",
        VIX_E_SNAPSHOT_NOT_FOUND => "The snapshot does not exist",
        VIX_E_CANNOT_CONNECT_TO_HOST => "Cannot connect to host",
        _ => "Unknown error",
    }
}

// =============================================================================
// PROPERTY IDS
// =============================================================================

pub const VIX_PROPERTY_NONE: PropertyId = 0;
pub const VIX_PROPERTY_META_DATA_CONTAINER: PropertyId = 2;
pub const VIX_PROPERTY_HOST_HOSTTYPE: PropertyId = 50;
pub const VIX_PROPERTY_HOST_API_VERSION: PropertyId = 51;
pub const VIX_PROPERTY_VM_NUM_VCPUS: PropertyId = 101;
pub const VIX_PROPERTY_VM_VMX_PATHNAME: PropertyId = 103;
pub const VIX_PROPERTY_VM_VMTEAM_PATHNAME: PropertyId = 105;
pub const VIX_PROPERTY_VM_MEMORY_SIZE: PropertyId = 106;
pub const VIX_PROPERTY_VM_IN_VMTEAM: PropertyId = 128;
pub const VIX_PROPERTY_VM_POWER_STATE: PropertyId = 129;
pub const VIX_PROPERTY_VM_TOOLS_STATE: PropertyId = 152;
pub const VIX_PROPERTY_VM_IS_RUNNING: PropertyId = 196;
pub const VIX_PROPERTY_JOB_RESULT_ERROR_CODE: PropertyId = 3000;
pub const VIX_PROPERTY_JOB_RESULT_HANDLE: PropertyId = 3010;
pub const VIX_PROPERTY_FOUND_ITEM_LOCATION: PropertyId = 4010;
pub const VIX_PROPERTY_SNAPSHOT_DISPLAYNAME: PropertyId = 4200;
pub const VIX_PROPERTY_SNAPSHOT_DESCRIPTION: PropertyId = 4201;
pub const VIX_PROPERTY_SNAPSHOT_POWERSTATE: PropertyId = 4205;

// =============================================================================
// PROPERTY TYPE TAGS
// =============================================================================

pub const VIX_PROPERTYTYPE_ANY: i32 = 0;
pub const VIX_PROPERTYTYPE_INTEGER: i32 = 1;
pub const VIX_PROPERTYTYPE_STRING: i32 = 2;
pub const VIX_PROPERTYTYPE_BOOL: i32 = 3;
pub const VIX_PROPERTYTYPE_HANDLE: i32 = 4;
pub const VIX_PROPERTYTYPE_INT64: i32 = 5;
pub const VIX_PROPERTYTYPE_BLOB: i32 = 6;

// =============================================================================
// EVENTS, SEARCHES, PROVIDERS
// =============================================================================

pub const VIX_EVENTTYPE_JOB_COMPLETED: i32 = 2;
pub const VIX_EVENTTYPE_JOB_PROGRESS: i32 = 3;
pub const VIX_EVENTTYPE_FIND_ITEM: i32 = 8;

pub const VIX_FIND_RUNNING_VMS: i32 = 1;
pub const VIX_FIND_REGISTERED_VMS: i32 = 4;

pub const VIX_SERVICEPROVIDER_DEFAULT: i32 = 1;
pub const VIX_SERVICEPROVIDER_VMWARE_SERVER: i32 = 2;
pub const VIX_SERVICEPROVIDER_VMWARE_WORKSTATION: i32 = 3;

pub const VIX_TOOLSSTATE_UNKNOWN: i32 = 0x0001;
pub const VIX_TOOLSSTATE_RUNNING: i32 = 0x0002;
pub const VIX_TOOLSSTATE_NOT_INSTALLED: i32 = 0x0004;

pub const VIX_VMPOWEROP_NORMAL: i32 = 0;
pub const VIX_VMPOWEROP_LAUNCH_GUI: i32 = 0x0200;

pub const VIX_POWERSTATE_POWERED_OFF: i32 = 0x0002;
pub const VIX_POWERSTATE_POWERED_ON: i32 = 0x0008;
pub const VIX_POWERSTATE_SUSPENDED: i32 = 0x0010;
