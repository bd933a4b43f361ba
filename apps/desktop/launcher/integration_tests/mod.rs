mod forward;
mod helpers;
mod serve;
