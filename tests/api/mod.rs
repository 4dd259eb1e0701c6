mod health_tests;
mod typing_tests;
mod voice_tests;
