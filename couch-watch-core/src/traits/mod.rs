pub mod alarm_player;
pub mod frame_source;
pub mod mask_builder;
pub mod motion_detector;
pub mod notification;
pub mod recorder;
