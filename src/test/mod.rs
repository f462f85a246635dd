mod sim_time;
mod simulator;
mod switch_network;
mod sw_transfer;
